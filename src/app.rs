use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::cli::{Command, LinkMode, LinkSettings, LogLevel};
use crate::telemetry;
use crate::transport::{
    ActiveTransport, BtleplugBackend, DirectLinkTransport, FakeLinkBackend, FakeLinkConfig,
    HttpRelayClient, LinkBackend, RelayApi, RelayTransport, Transport, TransportMode, detect_mode,
};

/// Picks the transport for this run and builds it, unconnected.
///
/// `auto` probes the relay once; the fake backend always means bluetooth.
///
/// # Errors
///
/// Returns an error when the BLE manager cannot be created.
#[instrument(skip(settings), level = "debug", fields(mode = ?settings.mode))]
pub async fn select_transport(settings: LinkSettings) -> Result<ActiveTransport> {
    let LinkSettings {
        mode,
        direct,
        relay,
        screen_size: _,
        fake,
    } = settings;

    if let Some(fake) = fake {
        let (scan_fixture, discovery_delay) = fake.into_parts();
        let backend = FakeLinkBackend::new(
            FakeLinkConfig::builder()
                .scan_fixture(scan_fixture)
                .discovery_delay(discovery_delay)
                .build(),
        );
        return Ok(ActiveTransport::Bluetooth(DirectLinkTransport::new(
            Arc::new(backend),
            direct,
        )));
    }

    let client = HttpRelayClient::new(relay.base_url());
    let selected = match mode {
        LinkMode::Bluetooth => TransportMode::Bluetooth,
        LinkMode::Relay => TransportMode::Relay,
        LinkMode::Auto => detect_mode(&client, relay.health_timeout()).await,
    };
    info!(%selected, "transport selected");

    Ok(match selected {
        TransportMode::Relay => {
            let api: Arc<dyn RelayApi> = Arc::new(client);
            ActiveTransport::Relay(RelayTransport::new(api, relay))
        }
        TransportMode::Bluetooth | TransportMode::Detecting => {
            let backend: Arc<dyn LinkBackend> = Arc::new(BtleplugBackend::new().await?);
            ActiveTransport::Bluetooth(DirectLinkTransport::new(backend, direct))
        }
    })
}

/// Runs one CLI command.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = idm_link::Args::try_parse_from([
///     "idm-link",
///     "--fake",
///     "--fake-scan",
///     "AA:BB:CC|IDM-Clock|-43",
///     "send",
///     "power",
///     "on",
/// ])?;
/// let log_level = args.log_level();
/// let (command, settings) = args.into_command_and_settings()?;
/// let mut out = Vec::new();
/// idm_link::run(command, settings, &mut out, log_level).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the link cannot be
/// established, the command fails, or output writing fails.
pub async fn run<W>(
    command: Command,
    settings: LinkSettings,
    out: &mut W,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "idm-link",
        true,
        log_level.map(LogLevel::as_level_filter),
    )?;
    run_command(command, settings, out).await
}

#[instrument(skip_all, level = "info", fields(command = command_name(&command)))]
async fn run_command<W>(command: Command, settings: LinkSettings, out: &mut W) -> Result<()>
where
    W: io::Write,
{
    let screen_size = settings.screen_size;
    let transport = select_transport(settings).await?;

    match command {
        Command::Scan => crate::cli::scan::run(&transport, out).await,
        Command::Watch(args) => {
            transport.connect().await?;
            let watched =
                crate::cli::watch::run(&transport, &args, io::stdout().is_terminal(), out).await;
            close(&transport).await;
            watched.map(|_summary| ())
        }
        Command::Send(args) => {
            transport.connect().await?;
            let sent = crate::cli::send::run(&transport, &args, screen_size, out).await;
            close(&transport).await;
            sent
        }
    }
}

async fn close(transport: &dyn Transport) {
    if let Err(error) = transport.disconnect().await {
        warn!(?error, "failed to disconnect cleanly");
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Scan => "scan",
        Command::Watch(_args) => "watch",
        Command::Send(_args) => "send",
    }
}
