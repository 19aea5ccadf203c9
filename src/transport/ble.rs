use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::time::{Instant, sleep};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::direct::{LinkBackend, LinkSession};
use super::{DiscoveredDevice, WriteMode};
use crate::error::BackendError;
use crate::protocol::{EndpointId, endpoint_metadata};

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// [`LinkBackend`] backed by `btleplug`.
#[derive(Debug)]
pub struct BtleplugBackend {
    manager: Manager,
}

impl BtleplugBackend {
    /// Creates the real BLE backend.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform BLE manager cannot be created.
    pub async fn new() -> Result<Self, BackendError> {
        let manager = Manager::new().await?;
        Ok(Self { manager })
    }

    #[instrument(skip(self), level = "trace")]
    async fn adapters(&self) -> Result<Vec<Adapter>, BackendError> {
        let adapters = self.manager.adapters().await?;
        if adapters.is_empty() {
            return Err(BackendError::NoAdapters);
        }
        Ok(adapters)
    }
}

#[async_trait]
impl LinkBackend for BtleplugBackend {
    #[instrument(skip(self), level = "debug", fields(prefix = name_prefix))]
    async fn discover(
        &self,
        name_prefix: &str,
        window: Duration,
    ) -> Result<Vec<DiscoveredDevice>, BackendError> {
        let adapters = self.adapters().await?;
        info!(adapter_count = adapters.len(), ?window, "starting BLE scan");
        for adapter in &adapters {
            adapter.start_scan(ScanFilter::default()).await?;
        }

        let deadline = Instant::now() + window;
        let found = loop {
            let found = matching_devices(&adapters, name_prefix).await?;
            if !found.is_empty() || Instant::now() >= deadline {
                break found;
            }
            sleep(SCAN_POLL_INTERVAL).await;
        };

        for adapter in &adapters {
            if let Err(error) = adapter.stop_scan().await {
                debug!(?error, "failed to stop adapter scan cleanly");
            }
        }
        Ok(found)
    }

    #[instrument(skip(self), level = "debug")]
    async fn open(&self, identity: &str) -> Result<Box<dyn LinkSession>, BackendError> {
        for adapter in self.adapters().await? {
            for peripheral in adapter.peripherals().await? {
                if peripheral.id().to_string() != identity {
                    continue;
                }

                if !peripheral.is_connected().await? {
                    peripheral.connect().await?;
                }
                peripheral.discover_services().await?;
                let write = match write_characteristic(&peripheral) {
                    Ok(characteristic) => characteristic,
                    Err(error) => {
                        if let Err(disconnect_error) = peripheral.disconnect().await {
                            debug!(
                                ?disconnect_error,
                                "failed to disconnect after endpoint lookup failed"
                            );
                        }
                        return Err(error);
                    }
                };
                let local_name = peripheral
                    .properties()
                    .await?
                    .and_then(|properties| properties.local_name);

                let lost = CancellationToken::new();
                let closed = CancellationToken::new();
                let events = adapter.events().await?;
                tokio::spawn(watch_disconnects(
                    events,
                    peripheral.id(),
                    lost.clone(),
                    closed.clone(),
                ));

                return Ok(Box::new(BtleplugSession {
                    peripheral,
                    write,
                    local_name,
                    lost,
                    closed,
                }));
            }
        }

        Err(BackendError::UnknownPeripheral {
            identity: identity.to_string(),
        })
    }
}

async fn matching_devices(
    adapters: &[Adapter],
    name_prefix: &str,
) -> Result<Vec<DiscoveredDevice>, BackendError> {
    let mut found = Vec::new();
    for adapter in adapters {
        for peripheral in adapter.peripherals().await? {
            let Some(properties) = peripheral.properties().await? else {
                continue;
            };
            if !matches_name_prefix(properties.local_name.as_deref(), name_prefix) {
                continue;
            }
            found.push(DiscoveredDevice::new(
                peripheral.id().to_string(),
                properties.local_name,
                properties.rssi,
            ));
        }
    }
    Ok(found)
}

async fn watch_disconnects(
    mut events: std::pin::Pin<Box<dyn tokio_stream::Stream<Item = CentralEvent> + Send>>,
    peripheral_id: PeripheralId,
    lost: CancellationToken,
    closed: CancellationToken,
) {
    loop {
        tokio::select! {
            () = closed.cancelled() => break,
            event = events.next() => match event {
                Some(CentralEvent::DeviceDisconnected(id)) if id == peripheral_id => {
                    lost.cancel();
                    break;
                }
                Some(_) => {}
                None => {
                    debug!("adapter event stream ended");
                    break;
                }
            },
        }
    }
}

fn write_characteristic(peripheral: &Peripheral) -> Result<Characteristic, BackendError> {
    let service_uuid = endpoint_metadata(EndpointId::ControlService).uuid();
    let write_uuid = endpoint_metadata(EndpointId::WriteCharacteristic).uuid();

    let service = peripheral
        .services()
        .into_iter()
        .find(|service| service.uuid.to_string().eq_ignore_ascii_case(service_uuid))
        .ok_or(BackendError::MissingEndpoint {
            endpoint: EndpointId::ControlService,
        })?;
    service
        .characteristics
        .into_iter()
        .find(|characteristic| {
            characteristic
                .uuid
                .to_string()
                .eq_ignore_ascii_case(write_uuid)
        })
        .ok_or(BackendError::MissingEndpoint {
            endpoint: EndpointId::WriteCharacteristic,
        })
}

fn matches_name_prefix(local_name: Option<&str>, name_prefix: &str) -> bool {
    if name_prefix.is_empty() {
        return true;
    }

    local_name.is_some_and(|value| value.starts_with(name_prefix))
}

#[derive(Debug)]
struct BtleplugSession {
    peripheral: Peripheral,
    write: Characteristic,
    local_name: Option<String>,
    lost: CancellationToken,
    closed: CancellationToken,
}

impl Drop for BtleplugSession {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

#[async_trait]
impl LinkSession for BtleplugSession {
    fn local_name(&self) -> Option<String> {
        self.local_name.clone()
    }

    #[instrument(skip(self, fragment), level = "trace", fields(?mode, len = fragment.len()))]
    async fn write(&self, fragment: &[u8], mode: WriteMode) -> Result<(), BackendError> {
        let write_type = match mode {
            WriteMode::WithResponse => WriteType::WithResponse,
            WriteMode::WithoutResponse => WriteType::WithoutResponse,
        };
        self.peripheral
            .write(&self.write, fragment, write_type)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn close(&self) -> Result<(), BackendError> {
        self.closed.cancel();
        if self.peripheral.is_connected().await? {
            self.peripheral.disconnect().await?;
        }
        Ok(())
    }

    fn link_lost(&self) -> CancellationToken {
        self.lost.clone()
    }
}
