use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::direct::{LinkBackend, LinkSession};
use super::{DiscoveredDevice, WriteMode};
use crate::error::{BackendError, FixtureError};

/// Parsed fake discovery fixture: `identity|name|rssi` records joined by `;`.
#[derive(Debug, Clone, derive_more::Into)]
pub struct ScanFixture {
    devices: Vec<DiscoveredDevice>,
}

impl FromStr for ScanFixture {
    type Err = FixtureError;

    /// ```
    /// use idm_link::ScanFixture;
    ///
    /// let fixture: ScanFixture = "AA:BB:CC|IDM-Clock|-43;11:22:33|Speaker|-70".parse()?;
    /// let devices: Vec<idm_link::DiscoveredDevice> = fixture.into();
    /// assert_eq!(Some("IDM-Clock"), devices[0].local_name());
    /// # Ok::<(), idm_link::FixtureError>(())
    /// ```
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let records: Vec<&str> = value
            .split(';')
            .map(str::trim)
            .filter(|record| !record.is_empty())
            .collect();
        if records.is_empty() {
            return Err(FixtureError::EmptyFixture);
        }

        let devices = records
            .into_iter()
            .map(parse_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { devices })
    }
}

fn parse_record(record: &str) -> Result<DiscoveredDevice, FixtureError> {
    let fields: Vec<&str> = record.split('|').map(str::trim).collect();
    let [identity, local_name, rssi] = fields.as_slice() else {
        return Err(FixtureError::InvalidRecordFieldCount);
    };
    if identity.is_empty() || local_name.is_empty() {
        return Err(FixtureError::EmptyRecordField);
    }
    let rssi = if rssi.is_empty() {
        None
    } else {
        Some(rssi.parse::<i16>()?)
    };

    Ok(DiscoveredDevice::new(
        (*identity).to_string(),
        Some((*local_name).to_string()),
        rssi,
    ))
}

/// Settings for the in-memory link backend.
#[derive(Debug, Builder)]
pub struct FakeLinkConfig {
    scan_fixture: ScanFixture,
    #[builder(default)]
    discovery_delay: Duration,
}

/// One write captured by the fake backend.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordedWrite {
    pub bytes: Vec<u8>,
    pub mode: WriteMode,
}

#[derive(Debug, Default)]
struct JournalInner {
    writes: Vec<RecordedWrite>,
    lost: Option<CancellationToken>,
    failing_writes: Option<String>,
    opened: usize,
    closed: usize,
}

/// Shared view into the fake backend, used to inspect writes and inject link events.
#[derive(Debug, Clone, Default)]
pub struct FakeLinkJournal {
    inner: Arc<Mutex<JournalInner>>,
}

impl FakeLinkJournal {
    fn with<T>(&self, action: impl FnOnce(&mut JournalInner) -> T) -> T {
        action(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Every fragment written so far, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.with(|inner| inner.writes.clone())
    }

    /// Number of links opened.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.with(|inner| inner.opened)
    }

    /// Number of links closed explicitly.
    #[must_use]
    pub fn closed(&self) -> usize {
        self.with(|inner| inner.closed)
    }

    /// Simulates the stack reporting the current link as dropped.
    pub fn drop_link(&self) {
        if let Some(lost) = self.with(|inner| inner.lost.take()) {
            lost.cancel();
        }
    }

    /// Makes every later write fail with `reason`, or succeed again with `None`.
    pub fn fail_writes(&self, reason: Option<&str>) {
        self.with(|inner| inner.failing_writes = reason.map(str::to_string));
    }
}

/// In-memory [`LinkBackend`] for tests and hardware-free runs.
#[derive(Debug)]
pub struct FakeLinkBackend {
    devices: Vec<DiscoveredDevice>,
    discovery_delay: Duration,
    journal: FakeLinkJournal,
}

impl FakeLinkBackend {
    #[must_use]
    pub fn new(config: FakeLinkConfig) -> Self {
        info!("using fake link backend");
        Self {
            devices: config.scan_fixture.into(),
            discovery_delay: config.discovery_delay,
            journal: FakeLinkJournal::default(),
        }
    }

    #[must_use]
    pub fn journal(&self) -> FakeLinkJournal {
        self.journal.clone()
    }
}

#[async_trait]
impl LinkBackend for FakeLinkBackend {
    async fn discover(
        &self,
        name_prefix: &str,
        _window: Duration,
    ) -> Result<Vec<DiscoveredDevice>, BackendError> {
        if !self.discovery_delay.is_zero() {
            sleep(self.discovery_delay).await;
        }
        Ok(self
            .devices
            .iter()
            .filter(|device| {
                device
                    .local_name()
                    .is_some_and(|name| name.starts_with(name_prefix))
            })
            .cloned()
            .collect())
    }

    async fn open(&self, identity: &str) -> Result<Box<dyn LinkSession>, BackendError> {
        let device = self
            .devices
            .iter()
            .find(|device| device.identity() == identity)
            .ok_or_else(|| BackendError::UnknownPeripheral {
                identity: identity.to_string(),
            })?;

        let lost = CancellationToken::new();
        self.journal.with(|inner| {
            inner.opened += 1;
            inner.lost = Some(lost.clone());
        });
        Ok(Box::new(FakeLinkSession {
            local_name: device.local_name().map(str::to_string),
            journal: self.journal.clone(),
            lost,
        }))
    }
}

#[derive(Debug)]
struct FakeLinkSession {
    local_name: Option<String>,
    journal: FakeLinkJournal,
    lost: CancellationToken,
}

#[async_trait]
impl LinkSession for FakeLinkSession {
    fn local_name(&self) -> Option<String> {
        self.local_name.clone()
    }

    async fn write(&self, fragment: &[u8], mode: WriteMode) -> Result<(), BackendError> {
        self.journal.with(|inner| {
            if let Some(reason) = &inner.failing_writes {
                return Err(BackendError::Simulated {
                    reason: reason.clone(),
                });
            }
            inner.writes.push(RecordedWrite {
                bytes: fragment.to_vec(),
                mode,
            });
            Ok(())
        })
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.journal.with(|inner| inner.closed += 1);
        Ok(())
    }

    fn link_lost(&self) -> CancellationToken {
        self.lost.clone()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn scan_fixture_parses_optional_rssi() {
        let fixture: ScanFixture = "AA|IDM-One|;BB|IDM-Two|-50"
            .parse()
            .expect("fixture should parse");
        let devices: Vec<DiscoveredDevice> = fixture.into();

        assert_eq!(
            vec![
                DiscoveredDevice::new("AA".to_string(), Some("IDM-One".to_string()), None),
                DiscoveredDevice::new("BB".to_string(), Some("IDM-Two".to_string()), Some(-50)),
            ],
            devices
        );
    }

    #[test]
    fn scan_fixture_rejects_malformed_records() {
        assert_matches!(
            "invalid-record".parse::<ScanFixture>(),
            Err(FixtureError::InvalidRecordFieldCount)
        );
        assert_matches!(" ; ".parse::<ScanFixture>(), Err(FixtureError::EmptyFixture));
        assert_matches!(
            "|IDM-One|-40".parse::<ScanFixture>(),
            Err(FixtureError::EmptyRecordField)
        );
        assert_matches!(
            "AA|IDM-One|loud".parse::<ScanFixture>(),
            Err(FixtureError::InvalidRssi(_))
        );
    }

    #[tokio::test]
    async fn discover_filters_by_prefix() {
        let backend = FakeLinkBackend::new(
            FakeLinkConfig::builder()
                .scan_fixture(
                    "11:22|Speaker|-70;AA:BB|IDM-Clock|-43"
                        .parse()
                        .expect("fixture should parse"),
                )
                .build(),
        );

        let found = backend
            .discover("IDM-", Duration::from_secs(1))
            .await
            .expect("fake discovery never fails");

        assert_eq!(vec!["AA:BB"], found.iter().map(DiscoveredDevice::identity).collect::<Vec<_>>());
    }
}
