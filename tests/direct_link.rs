use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use idm_link::{
    Chunker, ConnectionState, DirectLinkConfig, DirectLinkTransport, FakeLinkBackend,
    FakeLinkConfig, FakeLinkJournal, LinkError, LinkErrorKind, PowerHandler, ProtocolError,
    RecordedWrite, ScreenPower, Transport, TransportMode, WriteMode,
};

const FIXTURE: &str = "11:22:33|Speaker|-70;AA:BB:CC|IDM-Clock|-43";

fn fake_transport(config: DirectLinkConfig) -> (DirectLinkTransport, FakeLinkJournal) {
    let backend = FakeLinkBackend::new(
        FakeLinkConfig::builder()
            .scan_fixture(FIXTURE.parse().expect("fixture should parse"))
            .build(),
    );
    let journal = backend.journal();
    (DirectLinkTransport::new(Arc::new(backend), config), journal)
}

fn counter(transport: &dyn Transport) -> Arc<AtomicUsize> {
    let fired = Arc::new(AtomicUsize::new(0));
    transport.on_disconnect(Box::new({
        let fired = Arc::clone(&fired);
        move || {
            fired.fetch_add(1, Ordering::SeqCst);
        }
    }));
    fired
}

async fn wait_for_state(transport: &dyn Transport, expected: ConnectionState) {
    let mut states = transport.subscribe_state();
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|state| *state == expected))
        .await
        .expect("state change should arrive")
        .expect("state channel should stay open");
}

#[tokio::test]
async fn connect_picks_the_first_matching_panel() {
    let (transport, journal) = fake_transport(DirectLinkConfig::default());

    transport.connect().await.expect("connect should succeed");

    assert_eq!(TransportMode::Bluetooth, transport.mode());
    assert_eq!(ConnectionState::Connected, transport.state());
    assert_eq!(Some("IDM-Clock".to_string()), transport.device_name());
    assert_eq!(1, journal.opened());
}

#[tokio::test]
async fn configured_identity_skips_discovery_filtering() {
    let (transport, journal) = fake_transport(
        DirectLinkConfig::builder()
            .identity("11:22:33".to_string())
            .build(),
    );

    transport.connect().await.expect("connect should succeed");

    assert_eq!(Some("Speaker".to_string()), transport.device_name());
    assert_eq!(1, journal.opened());
}

#[tokio::test]
async fn unmatched_prefix_reports_discovery_failure() {
    let (transport, _journal) = fake_transport(
        DirectLinkConfig::builder().name_prefix("LED-").build(),
    );

    let error = transport.connect().await.expect_err("nothing matches LED-");

    assert_eq!(LinkErrorKind::DiscoveryFailed, error.kind());
    assert_eq!(ConnectionState::Disconnected, transport.state());
}

#[tokio::test]
async fn long_commands_are_fragmented_with_a_final_acknowledgement() {
    let (transport, journal) = fake_transport(DirectLinkConfig::builder().mtu(4).build());
    transport.connect().await.expect("connect should succeed");

    transport
        .send_bytes(&[1, 2, 3, 4, 5, 6, 7, 8, 9], WriteMode::WithResponse)
        .await
        .expect("send should succeed");

    assert_eq!(
        vec![
            RecordedWrite {
                bytes: vec![1, 2, 3, 4],
                mode: WriteMode::WithoutResponse,
            },
            RecordedWrite {
                bytes: vec![5, 6, 7, 8],
                mode: WriteMode::WithoutResponse,
            },
            RecordedWrite {
                bytes: vec![9],
                mode: WriteMode::WithResponse,
            },
        ],
        journal.writes()
    );
}

#[tokio::test]
async fn chunk_streams_acknowledge_each_slice_once() {
    let (transport, journal) = fake_transport(DirectLinkConfig::default());
    transport.connect().await.expect("connect should succeed");
    let stream = Chunker::new(509)
        .expect("mtu is valid")
        .image_stream(&[3; 5000])
        .expect("payload should chunk");

    transport
        .send_packets(&stream, WriteMode::WithResponse)
        .await
        .expect("send should succeed");

    let writes = journal.writes();
    assert_eq!(11, writes.len());
    assert_eq!(
        vec![8, 10],
        writes
            .iter()
            .enumerate()
            .filter(|(_, write)| write.mode == WriteMode::WithResponse)
            .map(|(index, _)| index)
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn chunk_streams_are_refragmented_to_the_link_mtu() {
    let (transport, journal) = fake_transport(DirectLinkConfig::default());
    transport.connect().await.expect("connect should succeed");
    let stream = Chunker::new(4200)
        .expect("mtu is valid")
        .image_stream(&[7; 4096])
        .expect("payload should chunk");
    assert_eq!(vec![4105], stream.slices()[0].fragments().iter().map(Vec::len).collect::<Vec<_>>());

    transport
        .send_packets(&stream, WriteMode::WithResponse)
        .await
        .expect("send should succeed");

    let writes = journal.writes();
    assert_eq!(
        [vec![509; 8], vec![33]].concat(),
        writes.iter().map(|write| write.bytes.len()).collect::<Vec<_>>()
    );
    assert_eq!(
        stream.slices()[0].large_packet(),
        writes.iter().flat_map(|write| write.bytes.clone()).collect::<Vec<_>>()
    );
    assert_eq!(
        Some(WriteMode::WithResponse),
        writes.last().map(|write| write.mode)
    );
}

#[tokio::test]
async fn dropped_link_fires_the_disconnect_observer() {
    let (transport, journal) = fake_transport(DirectLinkConfig::default());
    let (fired_tx, mut fired_rx) = tokio::sync::mpsc::unbounded_channel();
    transport.on_disconnect(Box::new(move || {
        let _ = fired_tx.send(());
    }));
    transport.connect().await.expect("connect should succeed");

    journal.drop_link();
    tokio::time::timeout(Duration::from_secs(5), fired_rx.recv())
        .await
        .expect("observer should fire")
        .expect("observer should stay registered");

    wait_for_state(&transport, ConnectionState::Disconnected).await;
    assert!(fired_rx.try_recv().is_err());
    assert_eq!(None, transport.device_name());
    assert_matches!(
        transport.send_bytes(&[1], WriteMode::WithoutResponse).await,
        Err(LinkError::NotConnected)
    );
}

#[tokio::test]
async fn explicit_disconnect_is_silent() {
    let (transport, journal) = fake_transport(DirectLinkConfig::default());
    let fired = counter(&transport);
    transport.connect().await.expect("connect should succeed");

    transport.disconnect().await.expect("disconnect should succeed");
    tokio::task::yield_now().await;

    assert_eq!(0, fired.load(Ordering::SeqCst));
    assert_eq!(1, journal.closed());
    assert_eq!(ConnectionState::Disconnected, transport.state());
}

#[tokio::test]
async fn failed_writes_surface_through_handlers() {
    let (transport, journal) = fake_transport(DirectLinkConfig::default());
    transport.connect().await.expect("connect should succeed");
    journal.fail_writes(Some("radio off"));

    let error = PowerHandler::set_power(&transport, ScreenPower::On)
        .await
        .expect_err("write should fail");

    assert_matches!(error, ProtocolError::Link(link) if link.kind() == LinkErrorKind::SendFailed);
}

#[tokio::test]
async fn handlers_refuse_to_send_before_connect() {
    let (transport, journal) = fake_transport(DirectLinkConfig::default());

    let error = PowerHandler::set_power(&transport, ScreenPower::Off)
        .await
        .expect_err("transport is not connected");

    assert_matches!(error, ProtocolError::Link(link) if link.kind() == LinkErrorKind::NotConnected);
    assert!(journal.writes().is_empty());
}
