use async_trait::async_trait;
use tokio::sync::watch;

use super::{
    ConnectionState, DirectLinkTransport, DiscoveredDevice, Observer, RelayTransport, Transport,
    TransportMode, WriteMode,
};
use crate::codec::ChunkStream;
use crate::error::LinkError;

/// The transport chosen for this run.
#[derive(Debug)]
pub enum ActiveTransport {
    Bluetooth(DirectLinkTransport),
    Relay(RelayTransport),
}

impl ActiveTransport {
    fn inner(&self) -> &dyn Transport {
        match self {
            Self::Bluetooth(transport) => transport,
            Self::Relay(transport) => transport,
        }
    }
}

#[async_trait]
impl Transport for ActiveTransport {
    fn mode(&self) -> TransportMode {
        self.inner().mode()
    }

    async fn scan(&self) -> Result<Vec<DiscoveredDevice>, LinkError> {
        self.inner().scan().await
    }

    async fn connect(&self) -> Result<(), LinkError> {
        self.inner().connect().await
    }

    async fn disconnect(&self) -> Result<(), LinkError> {
        self.inner().disconnect().await
    }

    async fn send_bytes(&self, data: &[u8], mode: WriteMode) -> Result<(), LinkError> {
        self.inner().send_bytes(data, mode).await
    }

    async fn send_packets(&self, stream: &ChunkStream, mode: WriteMode) -> Result<(), LinkError> {
        self.inner().send_packets(stream, mode).await
    }

    fn on_disconnect(&self, observer: Observer) {
        self.inner().on_disconnect(observer);
    }

    fn on_reconnect(&self, observer: Observer) {
        self.inner().on_reconnect(observer);
    }

    fn state(&self) -> ConnectionState {
        self.inner().state()
    }

    fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner().subscribe_state()
    }

    fn device_name(&self) -> Option<String> {
        self.inner().device_name()
    }
}
