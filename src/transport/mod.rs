//! Device links: the [`Transport`] capability and its two implementations.

mod active;
mod ble;
mod detect;
mod direct;
mod fake;
mod relay;
mod state;

use async_trait::async_trait;
use serde::Serialize;
use strum_macros::{Display, EnumString};
use tokio::sync::watch;

use crate::codec::ChunkStream;
use crate::error::LinkError;

pub use active::ActiveTransport;
pub use ble::BtleplugBackend;
pub use detect::detect_mode;
pub use direct::{DirectLinkConfig, DirectLinkTransport, LinkBackend, LinkSession};
pub use fake::{FakeLinkBackend, FakeLinkConfig, FakeLinkJournal, RecordedWrite, ScanFixture};
pub use relay::{
    ConnectRequest, DEFAULT_RELAY_URL, HttpRelayClient, RelayApi, RelayConfig, RelayStatus,
    RelayTransport, ScanResponse, SendBatchRequest, SendRequest,
};

/// Acknowledgement requested for a link write.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    WithResponse,
    WithoutResponse,
}

impl WriteMode {
    /// Mode for fragment `index` of `count` when the caller asked for `self`.
    ///
    /// Only the final fragment carries the acknowledgement.
    ///
    /// ```
    /// use idm_link::WriteMode;
    ///
    /// assert_eq!(WriteMode::WithoutResponse, WriteMode::WithResponse.for_fragment(0, 2));
    /// assert_eq!(WriteMode::WithResponse, WriteMode::WithResponse.for_fragment(1, 2));
    /// ```
    #[must_use]
    pub fn for_fragment(self, index: usize, count: usize) -> Self {
        if self == Self::WithResponse && index + 1 == count {
            Self::WithResponse
        } else {
            Self::WithoutResponse
        }
    }

    #[must_use]
    pub fn with_response(self) -> bool {
        self == Self::WithResponse
    }
}

/// Link state of the active transport.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Which transport is in use. Decided once, before any connect.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportMode {
    /// The startup probe has not finished.
    Detecting,
    Bluetooth,
    Relay,
}

/// A device found by [`Transport::scan`].
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct DiscoveredDevice {
    identity: String,
    local_name: Option<String>,
    rssi: Option<i16>,
}

impl DiscoveredDevice {
    #[must_use]
    pub fn new(identity: String, local_name: Option<String>, rssi: Option<i16>) -> Self {
        Self {
            identity,
            local_name,
            rssi,
        }
    }

    /// Backend address used to reconnect (peripheral id or MAC address).
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn local_name(&self) -> Option<&str> {
        self.local_name.as_deref()
    }

    #[must_use]
    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }
}

/// Connectivity observer. Invoked best-effort; a panic inside it is logged and dropped.
pub type Observer = Box<dyn Fn() + Send + Sync>;

/// Capability shared by the direct link and the relay.
///
/// Callers await each send before issuing the next one.
#[async_trait]
pub trait Transport: Send + Sync {
    fn mode(&self) -> TransportMode;

    /// Discovers devices and caches the first one as the connect target.
    async fn scan(&self) -> Result<Vec<DiscoveredDevice>, LinkError>;

    /// Connects to the cached target, discovering one first if needed.
    ///
    /// Leaves the transport `Connected` on success and `Disconnected` on error.
    async fn connect(&self) -> Result<(), LinkError>;

    /// Closes the link. Never fires the disconnect observer.
    async fn disconnect(&self) -> Result<(), LinkError>;

    /// Sends one command, fragmenting by MTU.
    async fn send_bytes(&self, data: &[u8], mode: WriteMode) -> Result<(), LinkError>;

    /// Sends every slice of `stream` in order.
    async fn send_packets(&self, stream: &ChunkStream, mode: WriteMode) -> Result<(), LinkError>;

    /// Replaces the disconnect observer.
    fn on_disconnect(&self, observer: Observer);

    /// Replaces the reconnect observer.
    fn on_reconnect(&self, observer: Observer);

    fn state(&self) -> ConnectionState;

    /// Receiver that sees every state change.
    fn subscribe_state(&self) -> watch::Receiver<ConnectionState>;

    fn device_name(&self) -> Option<String>;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn is_reconnecting(&self) -> bool {
        self.state() == ConnectionState::Reconnecting
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(WriteMode::WithResponse, 3, vec![WriteMode::WithoutResponse, WriteMode::WithoutResponse, WriteMode::WithResponse])]
    #[case(WriteMode::WithResponse, 1, vec![WriteMode::WithResponse])]
    #[case(WriteMode::WithoutResponse, 2, vec![WriteMode::WithoutResponse, WriteMode::WithoutResponse])]
    fn only_last_fragment_requests_acknowledgement(
        #[case] requested: WriteMode,
        #[case] count: usize,
        #[case] expected: Vec<WriteMode>,
    ) {
        let modes: Vec<WriteMode> = (0..count)
            .map(|index| requested.for_fragment(index, count))
            .collect();
        assert_eq!(expected, modes);
    }

    #[test]
    fn transport_mode_parses_cli_spelling() {
        assert_eq!(Ok(TransportMode::Relay), "relay".parse());
        assert_eq!("bluetooth", TransportMode::Bluetooth.to_string());
    }
}
