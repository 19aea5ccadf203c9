use std::time::Duration;

use tracing::{debug, info, instrument};

use super::TransportMode;
use super::relay::RelayApi;

/// Probes the relay once and picks the transport for this run.
///
/// A relay that answers `GET /health` within `timeout` wins; anything else
/// (refused, timed out, non-2xx) falls back to the direct link.
#[instrument(skip(api), level = "debug")]
pub async fn detect_mode(api: &dyn RelayApi, timeout: Duration) -> TransportMode {
    match api.health(timeout).await {
        Ok(()) => {
            info!("relay reachable, using relay transport");
            TransportMode::Relay
        }
        Err(error) => {
            debug!(?error, "relay probe failed, using bluetooth");
            TransportMode::Bluetooth
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::error::{BackendError, RelayCallError};
    use crate::transport::{
        ConnectRequest, RelayStatus, ScanResponse, SendBatchRequest, SendRequest,
    };

    struct Probe {
        healthy: bool,
    }

    fn unused() -> RelayCallError {
        BackendError::Simulated {
            reason: "not part of the probe".to_string(),
        }
        .into()
    }

    #[async_trait]
    impl RelayApi for Probe {
        async fn health(&self, _timeout: Duration) -> Result<(), RelayCallError> {
            if self.healthy {
                Ok(())
            } else {
                Err(BackendError::RelayStatus {
                    status: 502,
                    body: String::new(),
                }
                .into())
            }
        }

        async fn scan(&self) -> Result<ScanResponse, RelayCallError> {
            Err(unused())
        }

        async fn connect(&self, _request: &ConnectRequest) -> Result<RelayStatus, RelayCallError> {
            Err(unused())
        }

        async fn disconnect(&self) -> Result<(), RelayCallError> {
            Err(unused())
        }

        async fn status(&self) -> Result<RelayStatus, RelayCallError> {
            Err(unused())
        }

        async fn send(&self, _request: &SendRequest) -> Result<(), RelayCallError> {
            Err(unused())
        }

        async fn send_batch(&self, _request: &SendBatchRequest) -> Result<(), RelayCallError> {
            Err(unused())
        }
    }

    #[rstest]
    #[case::healthy_relay(true, TransportMode::Relay)]
    #[case::unhealthy_relay(false, TransportMode::Bluetooth)]
    #[tokio::test]
    async fn probe_result_selects_mode(#[case] healthy: bool, #[case] expected: TransportMode) {
        let mode = detect_mode(&Probe { healthy }, Duration::from_millis(1500)).await;
        assert_eq!(expected, mode);
    }
}
