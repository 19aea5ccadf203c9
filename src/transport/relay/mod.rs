mod http;
mod poll;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bon::Builder;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, info, instrument, warn};

use self::poll::PollHandle;
use super::state::LinkState;
use super::{ConnectionState, DiscoveredDevice, Observer, Transport, TransportMode, WriteMode};
use crate::codec::ChunkStream;
use crate::error::{LinkError, RelayCallError};
use crate::media::ScreenSize;

pub use http::HttpRelayClient;

/// Relay base URL used when none is configured.
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8080/api";

/// Body of `POST /connect`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    pub screen_size: u16,
}

/// Body of `POST /scan`.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct ScanResponse {
    pub devices: Vec<String>,
}

/// Body of `GET /status` and `POST /connect`.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatus {
    pub connected: bool,
    #[serde(default)]
    pub reconnecting: bool,
    #[serde(default, alias = "macAddress")]
    pub identity: Option<String>,
}

/// Body of `POST /send`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Base64 of the command bytes.
    pub data: String,
    pub with_response: bool,
}

/// Body of `POST /send-batch`: slices of base64 fragments.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBatchRequest {
    pub packets: Vec<Vec<String>>,
    pub with_response: bool,
}

/// Calls offered by a relay process.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Succeeds iff a relay answers within `timeout`.
    async fn health(&self, timeout: Duration) -> Result<(), RelayCallError>;
    async fn scan(&self) -> Result<ScanResponse, RelayCallError>;
    async fn connect(&self, request: &ConnectRequest) -> Result<RelayStatus, RelayCallError>;
    async fn disconnect(&self) -> Result<(), RelayCallError>;
    async fn status(&self) -> Result<RelayStatus, RelayCallError>;
    async fn send(&self, request: &SendRequest) -> Result<(), RelayCallError>;
    async fn send_batch(&self, request: &SendBatchRequest) -> Result<(), RelayCallError>;
}

/// Settings for the relay transport.
#[derive(Debug, Clone, Builder)]
pub struct RelayConfig {
    #[builder(default = DEFAULT_RELAY_URL.to_string(), into)]
    base_url: String,
    #[builder(default = Duration::from_secs(3))]
    poll_interval: Duration,
    /// Timeout of the startup `GET /health` probe.
    #[builder(default = Duration::from_millis(1500))]
    health_timeout: Duration,
    #[builder(default)]
    screen_size: ScreenSize,
    /// Device the relay should connect to; the relay picks one when unset.
    #[builder(into)]
    identity: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RelayConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        self.health_timeout
    }
}

/// [`Transport`] through a relay process.
///
/// Liveness is learned by polling `GET /status` every `poll_interval` while
/// connected.
pub struct RelayTransport {
    api: Arc<dyn RelayApi>,
    config: RelayConfig,
    link: Arc<LinkState>,
    identity: Mutex<Option<String>>,
    poller: Mutex<Option<PollHandle>>,
    send_lock: AsyncMutex<()>,
}

impl std::fmt::Debug for RelayTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayTransport")
            .field("config", &self.config)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

impl RelayTransport {
    #[must_use]
    pub fn new(api: Arc<dyn RelayApi>, config: RelayConfig) -> Self {
        let identity = Mutex::new(config.identity.clone());
        Self {
            api,
            config,
            link: LinkState::new(),
            identity,
            poller: Mutex::new(None),
            send_lock: AsyncMutex::new(()),
        }
    }

    fn cached_identity(&self) -> Option<String> {
        self.identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn cache_identity(&self, identity: Option<String>) {
        *self.identity.lock().unwrap_or_else(PoisonError::into_inner) = identity;
    }

    fn take_poller(&self) -> Option<PollHandle> {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn start_polling(&self) {
        let handle = PollHandle::spawn(
            Arc::clone(&self.api),
            Arc::clone(&self.link),
            self.config.poll_interval,
        );
        *self.poller.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    async fn establish(&self) -> Result<Option<String>, LinkError> {
        let mut identity = self.cached_identity();
        if identity.is_none() {
            identity = self
                .scan()
                .await?
                .into_iter()
                .next()
                .map(|device| device.identity().to_string());
        }

        let request = ConnectRequest {
            identity: identity.clone(),
            screen_size: self.config.screen_size.side(),
        };
        let status = self.api.connect(&request).await.map_err(|error| {
            LinkError::from_relay(error, |source| LinkError::ConnectFailed {
                target: identity.clone().unwrap_or_else(|| "relay default".to_string()),
                source,
            })
        })?;
        if !status.connected {
            return Err(LinkError::ConnectRejected);
        }
        Ok(status.identity.or(identity))
    }

    fn ensure_sendable(&self) -> Result<(), LinkError> {
        match self.link.get() {
            ConnectionState::Connected | ConnectionState::Reconnecting => Ok(()),
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                Err(LinkError::NotConnected)
            }
        }
    }

    #[cfg(test)]
    fn poller_finished(&self) -> Option<bool> {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(PollHandle::is_finished)
    }
}

fn device_name_for(identity: Option<&str>) -> String {
    match identity {
        Some(identity) => format!("IDM ({identity})"),
        None => "IDM (relay)".to_string(),
    }
}

#[async_trait]
impl Transport for RelayTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::Relay
    }

    #[instrument(skip(self), level = "debug")]
    async fn scan(&self) -> Result<Vec<DiscoveredDevice>, LinkError> {
        let response = self
            .api
            .scan()
            .await
            .map_err(|error| LinkError::from_relay(error, LinkError::DiscoveryFailed))?;
        if let Some(first) = response.devices.first() {
            self.cache_identity(Some(first.clone()));
        }
        debug!(found = response.devices.len(), "relay scan finished");
        Ok(response
            .devices
            .into_iter()
            .map(|identity| DiscoveredDevice::new(identity, None, None))
            .collect())
    }

    #[instrument(skip(self), level = "debug", fields(base_url = %self.config.base_url))]
    async fn connect(&self) -> Result<(), LinkError> {
        if let Some(previous) = self.take_poller() {
            previous.stop().await;
        }

        self.link.set(ConnectionState::Connecting);
        match self.establish().await {
            Ok(identity) => {
                self.link
                    .set_device_name(Some(device_name_for(identity.as_deref())));
                self.cache_identity(identity);
                self.link.set(ConnectionState::Connected);
                self.start_polling();
                info!("connected through relay");
                Ok(())
            }
            Err(error) => {
                self.link.set(ConnectionState::Disconnected);
                Err(error)
            }
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn disconnect(&self) -> Result<(), LinkError> {
        if let Some(poller) = self.take_poller() {
            poller.stop().await;
        }
        if let Err(error) = self.api.disconnect().await {
            warn!(?error, "relay disconnect call failed");
        }
        self.link.set(ConnectionState::Disconnected);
        self.link.set_device_name(None);
        Ok(())
    }

    #[instrument(skip(self, data), level = "debug", fields(len = data.len(), ?mode))]
    async fn send_bytes(&self, data: &[u8], mode: WriteMode) -> Result<(), LinkError> {
        let _guard = self.send_lock.lock().await;
        self.ensure_sendable()?;
        let request = SendRequest {
            data: BASE64.encode(data),
            with_response: mode.with_response(),
        };
        self.api.send(&request).await.map_err(|error| {
            LinkError::from_relay(error, |source| LinkError::SendFailed {
                len: data.len(),
                source,
            })
        })
    }

    #[instrument(
        skip(self, stream),
        level = "debug",
        fields(slices = stream.slices().len(), ?mode)
    )]
    async fn send_packets(&self, stream: &ChunkStream, mode: WriteMode) -> Result<(), LinkError> {
        let _guard = self.send_lock.lock().await;
        self.ensure_sendable()?;
        let request = SendBatchRequest {
            packets: stream
                .slices()
                .iter()
                .map(|slice| {
                    slice
                        .fragments()
                        .iter()
                        .map(|fragment| BASE64.encode(fragment))
                        .collect()
                })
                .collect(),
            with_response: mode.with_response(),
        };
        self.api.send_batch(&request).await.map_err(|error| {
            LinkError::from_relay(error, |source| LinkError::SendFailed {
                len: stream.wire_len(),
                source,
            })
        })
    }

    fn on_disconnect(&self, observer: Observer) {
        self.link.disconnect_observer.replace(observer);
    }

    fn on_reconnect(&self, observer: Observer) {
        self.link.reconnect_observer.replace(observer);
    }

    fn state(&self) -> ConnectionState {
        self.link.get()
    }

    fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.link.subscribe()
    }

    fn device_name(&self) -> Option<String> {
        self.link.device_name()
    }
}
