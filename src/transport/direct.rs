use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::state::LinkState;
use super::{ConnectionState, DiscoveredDevice, Observer, Transport, TransportMode, WriteMode};
use crate::codec::ChunkStream;
use crate::error::{BackendError, LinkError};
use crate::protocol::{DEVICE_NAME_PREFIX, LINK_MTU};

/// Settings for the direct radio link.
#[derive(Debug, Clone, Builder)]
pub struct DirectLinkConfig {
    /// Advertised-name prefix used to filter discovery.
    #[builder(default = DEVICE_NAME_PREFIX.to_string(), into)]
    name_prefix: String,
    #[builder(default = LINK_MTU)]
    mtu: usize,
    /// How long one discovery pass waits for a matching advertisement.
    #[builder(default = Duration::from_secs(10))]
    scan_timeout: Duration,
    /// Peripheral to connect to without scanning first.
    #[builder(into)]
    identity: Option<String>,
}

impl Default for DirectLinkConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DirectLinkConfig {
    #[must_use]
    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    #[must_use]
    pub fn mtu(&self) -> usize {
        self.mtu
    }
}

/// Radio stack seam behind [`DirectLinkTransport`].
#[async_trait]
pub trait LinkBackend: Send + Sync {
    /// Returns peripherals whose advertised name starts with `name_prefix`.
    async fn discover(
        &self,
        name_prefix: &str,
        window: Duration,
    ) -> Result<Vec<DiscoveredDevice>, BackendError>;

    /// Opens a link to a previously discovered peripheral.
    async fn open(&self, identity: &str) -> Result<Box<dyn LinkSession>, BackendError>;
}

/// One open link to a peripheral.
#[async_trait]
pub trait LinkSession: Send + Sync {
    /// Advertised name of the connected peripheral.
    fn local_name(&self) -> Option<String>;

    /// Writes one fragment to the write characteristic.
    async fn write(&self, fragment: &[u8], mode: WriteMode) -> Result<(), BackendError>;

    async fn close(&self) -> Result<(), BackendError>;

    /// Token the backend cancels when the stack reports the link as dropped.
    fn link_lost(&self) -> CancellationToken;
}

/// Background task that turns a dropped link into a state change.
#[derive(Debug)]
struct LossWatcher {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for LossWatcher {
    fn drop(&mut self) {
        self.stop.cancel();
        self.task.abort();
    }
}

struct OpenLink {
    session: Box<dyn LinkSession>,
    _watcher: LossWatcher,
}

/// [`Transport`] over a native radio link.
///
/// A dropped link moves straight to `Disconnected`; there is no automatic
/// reconnection.
pub struct DirectLinkTransport {
    backend: Arc<dyn LinkBackend>,
    config: DirectLinkConfig,
    link: Arc<LinkState>,
    target: Mutex<Option<String>>,
    // Held for the whole of a send so fragments of two calls never interleave.
    open: AsyncMutex<Option<OpenLink>>,
}

impl std::fmt::Debug for DirectLinkTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectLinkTransport")
            .field("config", &self.config)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

impl DirectLinkTransport {
    #[must_use]
    pub fn new(backend: Arc<dyn LinkBackend>, config: DirectLinkConfig) -> Self {
        let target = Mutex::new(config.identity.clone());
        Self {
            backend,
            config,
            link: LinkState::new(),
            target,
            open: AsyncMutex::new(None),
        }
    }

    fn cached_target(&self) -> Option<String> {
        self.target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn cache_target(&self, identity: String) {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    async fn resolve_target(&self) -> Result<String, LinkError> {
        if let Some(identity) = self.cached_target() {
            return Ok(identity);
        }
        self.scan()
            .await?
            .into_iter()
            .next()
            .map(|device| device.identity)
            .ok_or_else(|| LinkError::NoMatchingDevice {
                prefix: self.config.name_prefix.clone(),
            })
    }

    async fn establish(&self) -> Result<OpenLink, LinkError> {
        let target = self.resolve_target().await?;
        let session = self
            .backend
            .open(&target)
            .await
            .map_err(|source| LinkError::ConnectFailed {
                target: target.clone(),
                source,
            })?;

        self.link
            .set_device_name(session.local_name().or_else(|| Some(target.clone())));
        let watcher = spawn_loss_watcher(Arc::clone(&self.link), session.link_lost());
        info!(%target, "direct link established");
        Ok(OpenLink {
            session,
            _watcher: watcher,
        })
    }

    async fn write_fragments(
        session: &dyn LinkSession,
        data: &[u8],
        mtu: usize,
        mode: WriteMode,
    ) -> Result<(), LinkError> {
        let fragments: Vec<&[u8]> = data.chunks(mtu.max(1)).collect();
        let count = fragments.len();
        for (index, fragment) in fragments.into_iter().enumerate() {
            let fragment_mode = mode.for_fragment(index, count);
            trace!(index, count, ?fragment_mode, bytes = %hex::encode(fragment), "writing fragment");
            session
                .write(fragment, fragment_mode)
                .await
                .map_err(|source| LinkError::SendFailed {
                    len: data.len(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// Stops the loss watcher before closing, so an explicit close never reads as a drop.
async fn close_link(link: OpenLink) {
    let OpenLink {
        session,
        _watcher: watcher,
    } = link;
    drop(watcher);
    if let Err(error) = session.close().await {
        warn!(?error, "failed to close direct link cleanly");
    }
}

fn spawn_loss_watcher(link: Arc<LinkState>, lost: CancellationToken) -> LossWatcher {
    let stop = CancellationToken::new();
    let task = tokio::spawn({
        let stop = stop.clone();
        async move {
            tokio::select! {
                biased;
                () = stop.cancelled() => {}
                () = lost.cancelled() => {
                    warn!("direct link dropped");
                    link.set_device_name(None);
                    link.set(ConnectionState::Disconnected);
                    link.disconnect_observer.notify("disconnect");
                }
            }
        }
    });
    LossWatcher { stop, task }
}

#[async_trait]
impl Transport for DirectLinkTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::Bluetooth
    }

    #[instrument(skip(self), level = "debug", fields(prefix = %self.config.name_prefix))]
    async fn scan(&self) -> Result<Vec<DiscoveredDevice>, LinkError> {
        let devices = self
            .backend
            .discover(&self.config.name_prefix, self.config.scan_timeout)
            .await
            .map_err(LinkError::DiscoveryFailed)?;
        if let Some(first) = devices.first() {
            self.cache_target(first.identity.clone());
        }
        debug!(found = devices.len(), "discovery finished");
        Ok(devices)
    }

    #[instrument(skip(self), level = "debug")]
    async fn connect(&self) -> Result<(), LinkError> {
        let mut open = self.open.lock().await;
        if open.is_some() && self.link.get() == ConnectionState::Connected {
            return Ok(());
        }
        if let Some(stale) = open.take() {
            close_link(stale).await;
        }

        self.link.set(ConnectionState::Connecting);
        match self.establish().await {
            Ok(link) => {
                *open = Some(link);
                self.link.set(ConnectionState::Connected);
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
        let closing = self.open.lock().await.take();
        self.link.set(ConnectionState::Disconnected);
        if let Some(link) = closing {
            close_link(link).await;
        }
        Ok(())
    }

    #[instrument(skip(self, data), level = "debug", fields(len = data.len(), ?mode))]
    async fn send_bytes(&self, data: &[u8], mode: WriteMode) -> Result<(), LinkError> {
        let open = self.open.lock().await;
        let Some(link) = open.as_ref().filter(|_| self.is_connected()) else {
            return Err(LinkError::NotConnected);
        };
        Self::write_fragments(link.session.as_ref(), data, self.config.mtu, mode).await
    }

    #[instrument(
        skip(self, stream),
        level = "debug",
        fields(slices = stream.slices().len(), ?mode)
    )]
    async fn send_packets(&self, stream: &ChunkStream, mode: WriteMode) -> Result<(), LinkError> {
        let open = self.open.lock().await;
        let Some(link) = open.as_ref().filter(|_| self.is_connected()) else {
            return Err(LinkError::NotConnected);
        };
        // Re-split each slice so the link MTU holds whatever MTU the chunker used.
        for slice in stream.slices() {
            Self::write_fragments(
                link.session.as_ref(),
                &slice.large_packet(),
                self.config.mtu,
                mode,
            )
            .await?;
        }
        Ok(())
    }

    fn on_disconnect(&self, observer: Observer) {
        self.link.disconnect_observer.replace(observer);
    }

    fn on_reconnect(&self, observer: Observer) {
        // Direct links never reconnect on their own; keep the registration for symmetry.
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
