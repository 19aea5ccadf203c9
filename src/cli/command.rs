use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::cli::send::SendArgs;
use crate::cli::watch::WatchArgs;
use crate::error::{CliConfigError, FixtureError};
use crate::media::ScreenSize;
use crate::protocol::{DEVICE_NAME_PREFIX, LINK_MTU};
use crate::transport::{DEFAULT_RELAY_URL, DirectLinkConfig, RelayConfig, ScanFixture};

/// Command-line options for driving iDotMatrix panels directly or through a relay.
#[derive(Debug, Parser)]
#[command(name = "idm-link", about = "Drive iDotMatrix panels over BLE or a relay.")]
pub struct Args {
    /// Transport selection; `auto` probes the relay first.
    #[arg(long, global = true, env = "IDM_MODE", value_enum, default_value_t = LinkMode::Auto)]
    mode: LinkMode,
    /// Relay base URL, including any path prefix.
    #[arg(long, global = true, env = "IDM_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    relay_url: String,
    /// Device to connect to, skipping discovery.
    #[arg(long, global = true, env = "IDM_IDENTITY")]
    identity: Option<String>,
    /// Panel edge length in pixels (16, 32 or 64).
    #[arg(long, global = true, env = "IDM_SCREEN_SIZE", default_value_t = ScreenSize::Size32)]
    screen_size: ScreenSize,
    /// Relay status poll interval (e.g. `3s`).
    #[arg(long, global = true, value_parser = parse_duration, default_value = "3s")]
    poll_interval: Duration,
    /// Advertised-name prefix used by BLE discovery.
    #[arg(long, global = true, default_value = DEVICE_NAME_PREFIX)]
    name_prefix: String,
    /// How long one BLE discovery pass waits (e.g. `10s`).
    #[arg(long, global = true, value_parser = parse_duration, default_value = "10s")]
    scan_timeout: Duration,
    /// Overrides `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Uses the in-memory BLE backend with fixture-driven discovery.
    #[arg(long, global = true)]
    fake: bool,
    /// Fake scan fixture in the form `identity|local_name|rssi;...`.
    #[arg(long, global = true, requires = "fake", required_if_eq("fake", "true"))]
    fake_scan: Option<ScanFixture>,
    /// Artificial fake scan delay (e.g. `250ms`).
    #[arg(long, global = true, requires = "fake", value_parser = parse_duration)]
    fake_discovery_delay: Option<Duration>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Log level requested on the command line, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Splits parsed arguments into the command and the link settings it runs with.
    ///
    /// # Errors
    ///
    /// Returns an error when the fake backend is combined with the relay, or
    /// enabled without a scan fixture.
    pub fn into_command_and_settings(self) -> anyhow::Result<(Command, LinkSettings)> {
        let Args {
            mode,
            relay_url,
            identity,
            screen_size,
            poll_interval,
            name_prefix,
            scan_timeout,
            log_level: _,
            fake,
            fake_scan,
            fake_discovery_delay,
            command,
        } = self;

        let fake = if fake {
            if mode == LinkMode::Relay {
                return Err(CliConfigError::FakeRequiresBluetooth.into());
            }
            let Some(scan_fixture) = fake_scan else {
                return Err(CliConfigError::MissingFakeScanFixture.into());
            };
            Some(FakeArgs {
                scan_fixture,
                discovery_delay: fake_discovery_delay.unwrap_or(Duration::ZERO),
            })
        } else {
            None
        };

        let settings = LinkSettings {
            mode,
            direct: DirectLinkConfig::builder()
                .name_prefix(name_prefix)
                .mtu(LINK_MTU)
                .scan_timeout(scan_timeout)
                .maybe_identity(identity.clone())
                .build(),
            relay: RelayConfig::builder()
                .base_url(relay_url)
                .poll_interval(poll_interval)
                .screen_size(screen_size)
                .maybe_identity(identity)
                .build(),
            screen_size,
            fake,
        };
        Ok((command, settings))
    }
}

/// Requested transport.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LinkMode {
    /// Use the relay when `GET /health` answers, BLE otherwise.
    Auto,
    Bluetooth,
    Relay,
}

/// Log level accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Fake backend arguments for hardware-free runs.
#[derive(Debug, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> Result<_, FixtureError> { value.parse() })]
    scan_fixture: ScanFixture,
    #[builder(default)]
    discovery_delay: Duration,
}

impl FakeArgs {
    pub(crate) fn into_parts(self) -> (ScanFixture, Duration) {
        (self.scan_fixture, self.discovery_delay)
    }
}

/// Everything needed to build the transport for one run.
#[derive(Debug, Builder)]
pub struct LinkSettings {
    #[builder(default = LinkMode::Auto)]
    pub(crate) mode: LinkMode,
    #[builder(default)]
    pub(crate) direct: DirectLinkConfig,
    #[builder(default)]
    pub(crate) relay: RelayConfig,
    #[builder(default)]
    pub(crate) screen_size: ScreenSize,
    pub(crate) fake: Option<FakeArgs>,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover devices and print them.
    Scan,
    /// Connect and print connectivity changes until Ctrl+C.
    Watch(WatchArgs),
    /// Connect and send one command.
    Send(SendArgs),
}

pub(crate) fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fake_mode_requires_scan_fixture() {
        let error = Args::try_parse_from(["idm-link", "--fake", "scan"])
            .expect_err("missing --fake-scan should fail argument parsing");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn fake_scan_requires_fake_mode() {
        let error = Args::try_parse_from(["idm-link", "--fake-scan", "AA|IDM-Clock|-43", "scan"])
            .expect_err("--fake-scan should require --fake");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn fake_relay_combination_is_rejected() {
        let args = Args::try_parse_from([
            "idm-link",
            "--mode",
            "relay",
            "--fake",
            "--fake-scan",
            "AA|IDM-Clock|-43",
            "scan",
        ])
        .expect("arguments should parse");

        let error = args
            .into_command_and_settings()
            .expect_err("fake relay should be rejected");
        assert_matches!(
            error.downcast_ref::<CliConfigError>(),
            Some(CliConfigError::FakeRequiresBluetooth)
        );
    }

    #[test]
    fn global_flags_feed_link_settings() {
        let args = Args::try_parse_from([
            "idm-link",
            "--mode",
            "relay",
            "--relay-url",
            "http://relay.local:9000/api",
            "--poll-interval",
            "500ms",
            "--screen-size",
            "64",
            "--identity",
            "AA:BB",
            "scan",
        ])
        .expect("arguments should parse");

        let (command, settings) = args
            .into_command_and_settings()
            .expect("settings should build");

        assert_matches!(command, Command::Scan);
        assert_eq!(LinkMode::Relay, settings.mode);
        assert_eq!("http://relay.local:9000/api", settings.relay.base_url());
        assert_eq!(Duration::from_millis(500), settings.relay.poll_interval());
        assert_eq!(ScreenSize::Size64, settings.screen_size);
        assert!(settings.fake.is_none());
    }

    #[test]
    fn invalid_duration_is_a_value_error() {
        let error = Args::try_parse_from(["idm-link", "--poll-interval", "soon", "scan"])
            .expect_err("bad duration should fail");
        assert_eq!(ErrorKind::ValueValidation, error.kind());
    }
}
