use std::io;

use anyhow::Result;
use serde::Serialize;
use tracing::instrument;

use crate::cli::write_json_line;
use crate::transport::{DiscoveredDevice, Transport, TransportMode};

#[derive(Debug, Serialize)]
struct ScanResult {
    mode: TransportMode,
    devices: Vec<DiscoveredDevice>,
}

/// Executes the `scan` command.
#[instrument(skip_all, level = "info")]
pub(crate) async fn run<W>(transport: &dyn Transport, out: &mut W) -> Result<()>
where
    W: io::Write,
{
    let devices = transport.scan().await?;
    write_json_line(
        out,
        &ScanResult {
            mode: transport.mode(),
            devices,
        },
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::transport::{
        DirectLinkConfig, DirectLinkTransport, FakeLinkBackend, FakeLinkConfig,
    };

    #[tokio::test]
    async fn scan_prints_matching_devices() {
        let backend = FakeLinkBackend::new(
            FakeLinkConfig::builder()
                .scan_fixture(
                    "AA:BB|IDM-Clock|-43;CC:DD|Speaker|-70"
                        .parse()
                        .expect("fixture should parse"),
                )
                .build(),
        );
        let transport = DirectLinkTransport::new(Arc::new(backend), DirectLinkConfig::default());
        let mut out = Vec::new();

        run(&transport, &mut out).await.expect("scan should succeed");

        assert_eq!(
            serde_json::json!({
                "mode": "bluetooth",
                "devices": [{"identity": "AA:BB", "local_name": "IDM-Clock", "rssi": -43}],
            }),
            serde_json::from_slice::<serde_json::Value>(&out).expect("output should be json")
        );
    }
}
