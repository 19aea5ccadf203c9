use derive_more::From;
use strum_macros::Display;
use thiserror::Error;

use crate::codec::CodecError;
use crate::media::Rgb888FrameError;
use crate::protocol::{EndpointId, endpoint_metadata};

/// Failures raised by a link backend: the radio stack, the relay HTTP
/// client, or the in-memory fake.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("BLE operation failed")]
    Ble(#[from] btleplug::Error),
    #[error("no BLE adapters were found")]
    NoAdapters,
    #[error("peripheral `{identity}` is not known to any adapter")]
    UnknownPeripheral { identity: String },
    #[error(
        "required endpoint `{name}` ({uuid}) was not found on the connected device",
        name = endpoint_metadata(*endpoint).name(),
        uuid = endpoint_metadata(*endpoint).uuid()
    )]
    MissingEndpoint { endpoint: EndpointId },
    #[error("relay request failed")]
    Http(#[from] reqwest::Error),
    #[error("relay responded with status {status}: {body}")]
    RelayStatus { status: u16, body: String },
    #[error("simulated link failure: {reason}")]
    Simulated { reason: String },
}

/// Failures returned by one relay call.
#[derive(Debug, Error)]
pub enum RelayCallError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("relay returned a malformed `{endpoint}` response")]
    Malformed {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse classification of [`LinkError`]s.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum LinkErrorKind {
    DiscoveryFailed,
    ConnectFailed,
    NotConnected,
    SendFailed,
    MalformedResponse,
}

/// Errors surfaced by [`crate::Transport`] operations.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("no device matching `{prefix}*` was discovered")]
    NoMatchingDevice { prefix: String },
    #[error("device discovery failed")]
    DiscoveryFailed(#[source] BackendError),
    #[error("connecting to `{target}` failed")]
    ConnectFailed {
        target: String,
        #[source]
        source: BackendError,
    },
    #[error("relay accepted the connect call but reports the device link as down")]
    ConnectRejected,
    #[error("no active device link")]
    NotConnected,
    #[error("sending {len} bytes failed")]
    SendFailed {
        len: usize,
        #[source]
        source: BackendError,
    },
    #[error("relay returned a malformed `{endpoint}` response")]
    MalformedResponse {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl LinkError {
    /// Returns the error's classification.
    ///
    /// ```
    /// use idm_link::{LinkError, LinkErrorKind};
    ///
    /// assert_eq!(LinkErrorKind::NotConnected, LinkError::NotConnected.kind());
    /// assert_eq!(LinkErrorKind::ConnectFailed, LinkError::ConnectRejected.kind());
    /// ```
    #[must_use]
    pub fn kind(&self) -> LinkErrorKind {
        match self {
            Self::NoMatchingDevice { .. } | Self::DiscoveryFailed(_) => {
                LinkErrorKind::DiscoveryFailed
            }
            Self::ConnectFailed { .. } | Self::ConnectRejected => LinkErrorKind::ConnectFailed,
            Self::NotConnected => LinkErrorKind::NotConnected,
            Self::SendFailed { .. } => LinkErrorKind::SendFailed,
            Self::MalformedResponse { .. } => LinkErrorKind::MalformedResponse,
        }
    }

    /// Maps a relay call failure, using `wrap` for transport-level failures.
    pub(crate) fn from_relay(
        error: RelayCallError,
        wrap: impl FnOnce(BackendError) -> Self,
    ) -> Self {
        match error {
            RelayCallError::Backend(source) => wrap(source),
            RelayCallError::Malformed { endpoint, source } => {
                Self::MalformedResponse { endpoint, source }
            }
        }
    }
}

/// Errors returned when parsing fake link fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("the fake discovery fixture is empty")]
    EmptyFixture,
    #[error("fixture records must contain three pipe-delimited fields")]
    InvalidRecordFieldCount,
    #[error("fixture records cannot contain empty mandatory fields")]
    EmptyRecordField,
    #[error("failed to parse RSSI value")]
    InvalidRssi(#[from] std::num::ParseIntError),
}

/// Errors returned when validating runtime options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("the fake link backend only applies to the bluetooth transport")]
    FakeRequiresBluetooth,
    #[error("missing fake scan fixture while fake mode is enabled")]
    MissingFakeScanFixture,
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum ProtocolError {
    #[error(transparent)]
    #[from(CodecError, Box<CodecError>)]
    Codec(Box<CodecError>),
    #[error(transparent)]
    #[from(LinkError, Box<LinkError>)]
    Link(Box<LinkError>),
    #[error(transparent)]
    #[from(Rgb888FrameError, Box<Rgb888FrameError>)]
    Frame(Box<Rgb888FrameError>),
}
