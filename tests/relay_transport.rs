use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use idm_link::{
    Chunker, ConnectionState, HttpRelayClient, LinkError, LinkErrorKind, RelayConfig,
    RelayTransport, Transport, TransportMode, WriteMode, detect_mode,
};

/// Canned relay answers plus every request body it received.
#[derive(Clone)]
struct RelayScript {
    devices: Vec<String>,
    connect_body: String,
    status_body: String,
    received: Arc<Mutex<Vec<(String, Value)>>>,
}

impl RelayScript {
    fn healthy() -> Self {
        Self {
            devices: vec!["AA:BB:CC".to_string()],
            connect_body: r#"{"connected":true,"macAddress":"AA:BB:CC"}"#.to_string(),
            status_body: r#"{"connected":true}"#.to_string(),
            received: Arc::default(),
        }
    }

    fn record(&self, path: &str, body: Value) {
        self.received
            .lock()
            .expect("recorder lock")
            .push((path.to_string(), body));
    }

    fn received(&self) -> Vec<(String, Value)> {
        self.received.lock().expect("recorder lock").clone()
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn scan(State(script): State<RelayScript>) -> Json<Value> {
    script.record("scan", Value::Null);
    Json(json!({ "devices": script.devices }))
}

async fn connect(State(script): State<RelayScript>, Json(body): Json<Value>) -> String {
    script.record("connect", body);
    script.connect_body.clone()
}

async fn status(State(script): State<RelayScript>) -> String {
    script.status_body.clone()
}

async fn disconnect(State(script): State<RelayScript>) -> StatusCode {
    script.record("disconnect", Value::Null);
    StatusCode::OK
}

async fn send(State(script): State<RelayScript>, Json(body): Json<Value>) -> StatusCode {
    script.record("send", body);
    StatusCode::OK
}

async fn send_batch(State(script): State<RelayScript>, Json(body): Json<Value>) -> StatusCode {
    script.record("send-batch", body);
    StatusCode::OK
}

/// Serves `script` under `/api` and returns the base URL.
async fn spawn_relay(script: RelayScript) -> String {
    let api = Router::new()
        .route("/health", get(health))
        .route("/scan", post(scan))
        .route("/connect", post(connect))
        .route("/status", get(status))
        .route("/disconnect", post(disconnect))
        .route("/send", post(send))
        .route("/send-batch", post(send_batch))
        .with_state(script);
    let app = Router::new().nest("/api", api);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let address = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("relay should serve");
    });
    format!("http://{address}/api")
}

fn transport_for(base_url: &str, poll_interval: Duration) -> RelayTransport {
    RelayTransport::new(
        Arc::new(HttpRelayClient::new(base_url)),
        RelayConfig::builder()
            .base_url(base_url)
            .poll_interval(poll_interval)
            .build(),
    )
}

#[tokio::test]
async fn health_probe_selects_relay_mode() {
    let base_url = spawn_relay(RelayScript::healthy()).await;

    let mode = detect_mode(&HttpRelayClient::new(base_url), Duration::from_secs(2)).await;

    assert_eq!(TransportMode::Relay, mode);
}

#[tokio::test]
async fn unreachable_relay_falls_back_to_bluetooth() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let address = listener.local_addr().expect("listener address");
    drop(listener);

    let mode = detect_mode(
        &HttpRelayClient::new(format!("http://{address}/api")),
        Duration::from_millis(500),
    )
    .await;

    assert_eq!(TransportMode::Bluetooth, mode);
}

#[tokio::test]
async fn connect_scans_then_sends_base64_bodies() {
    let script = RelayScript::healthy();
    let base_url = spawn_relay(script.clone()).await;
    let transport = transport_for(&base_url, Duration::from_secs(60));

    transport.connect().await.expect("connect should succeed");
    assert_eq!(Some("IDM (AA:BB:CC)".to_string()), transport.device_name());
    transport
        .send_bytes(&[5, 0, 7, 1, 1], WriteMode::WithResponse)
        .await
        .expect("send should succeed");
    transport.disconnect().await.expect("disconnect should succeed");

    assert_eq!(
        vec![
            ("scan".to_string(), Value::Null),
            (
                "connect".to_string(),
                json!({ "identity": "AA:BB:CC", "screenSize": 32 })
            ),
            (
                "send".to_string(),
                json!({ "data": "BQAHAQE=", "withResponse": true })
            ),
            ("disconnect".to_string(), Value::Null),
        ],
        script.received()
    );
    assert_eq!(ConnectionState::Disconnected, transport.state());
}

#[tokio::test]
async fn chunk_streams_travel_as_one_batch() {
    let script = RelayScript::healthy();
    let base_url = spawn_relay(script.clone()).await;
    let transport = transport_for(&base_url, Duration::from_secs(60));
    let stream = Chunker::new(509)
        .expect("mtu is valid")
        .image_stream(&[7; 5000])
        .expect("payload should chunk");

    transport.connect().await.expect("connect should succeed");
    transport
        .send_packets(&stream, WriteMode::WithResponse)
        .await
        .expect("batch should succeed");

    let (path, body) = script
        .received()
        .into_iter()
        .find(|(path, _)| path == "send-batch")
        .expect("batch should reach the relay");
    assert_eq!("send-batch", path);
    let packets = body["packets"].as_array().expect("packets array");
    assert_eq!(
        vec![9, 2],
        packets
            .iter()
            .map(|slice| slice.as_array().map_or(0, Vec::len))
            .collect::<Vec<_>>()
    );
    assert_eq!(json!(true), body["withResponse"]);
}

#[tokio::test]
async fn malformed_connect_reply_is_reported() {
    let script = RelayScript {
        connect_body: "<html>gateway</html>".to_string(),
        ..RelayScript::healthy()
    };
    let base_url = spawn_relay(script).await;
    let transport = transport_for(&base_url, Duration::from_secs(60));

    let error = transport
        .connect()
        .await
        .expect_err("connect should fail");

    assert_eq!(LinkErrorKind::MalformedResponse, error.kind());
    assert_matches!(error, LinkError::MalformedResponse { endpoint: "connect", .. });
    assert_eq!(ConnectionState::Disconnected, transport.state());
}

#[tokio::test]
async fn dropped_device_link_fires_disconnect_from_polling() {
    let script = RelayScript {
        status_body: r#"{"connected":false}"#.to_string(),
        ..RelayScript::healthy()
    };
    let base_url = spawn_relay(script).await;
    let transport = transport_for(&base_url, Duration::from_millis(20));
    let (fired_tx, mut fired_rx) = tokio::sync::mpsc::unbounded_channel();
    transport.on_disconnect(Box::new(move || {
        let _ = fired_tx.send(());
    }));

    transport.connect().await.expect("connect should succeed");
    tokio::time::timeout(Duration::from_secs(5), fired_rx.recv())
        .await
        .expect("poller should observe the drop")
        .expect("observer should fire");

    assert_eq!(ConnectionState::Disconnected, transport.state());
    assert_eq!(
        LinkErrorKind::NotConnected,
        transport
            .send_bytes(&[5, 0, 7, 1, 1], WriteMode::WithoutResponse)
            .await
            .expect_err("send should fail")
            .kind()
    );
}
