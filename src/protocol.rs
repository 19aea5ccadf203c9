use std::collections::HashMap;
use std::sync::LazyLock;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Advertised local-name prefix of matrix panels.
pub const DEVICE_NAME_PREFIX: &str = "IDM-";

/// Largest fragment written to the link in one operation.
pub const LINK_MTU: usize = 509;

/// Size of one chunk-stream slice before its header is attached.
pub const SLICE_LEN: usize = 4096;

/// Image chunk header length.
pub const IMAGE_HEADER_LEN: usize = 9;

/// Animation chunk header length. Text commands use the same 16-byte shape.
pub const ANIMATION_HEADER_LEN: usize = 16;

/// Animation type byte used when the caller does not pick one.
pub const DEFAULT_ANIMATION_TYPE: u8 = 12;

/// Known link endpoints on the panel.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display)]
pub enum EndpointId {
    /// Primary control service.
    #[strum(to_string = "control_service")]
    ControlService,
    /// Characteristic used for command/data writes.
    #[strum(to_string = "write_characteristic")]
    WriteCharacteristic,
}

/// Descriptive metadata for one endpoint.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct EndpointMetadata {
    name: &'static str,
    uuid: &'static str,
}

impl EndpointMetadata {
    pub(crate) fn name(self) -> &'static str {
        self.name
    }

    pub(crate) fn uuid(self) -> &'static str {
        self.uuid
    }
}

static ENDPOINTS_BY_ID: LazyLock<HashMap<EndpointId, EndpointMetadata>> = LazyLock::new(|| {
    EndpointId::iter()
        .map(|endpoint| (endpoint, metadata_for(endpoint)))
        .collect()
});

/// Returns metadata for one endpoint.
pub(crate) fn endpoint_metadata(endpoint: EndpointId) -> EndpointMetadata {
    *ENDPOINTS_BY_ID
        .get(&endpoint)
        .unwrap_or(&metadata_for(endpoint))
}

fn metadata_for(endpoint: EndpointId) -> EndpointMetadata {
    match endpoint {
        EndpointId::ControlService => EndpointMetadata {
            name: "panel control service",
            uuid: "000000fa-0000-1000-8000-00805f9b34fb",
        },
        EndpointId::WriteCharacteristic => EndpointMetadata {
            name: "panel write data",
            uuid: "0000fa02-0000-1000-8000-00805f9b34fb",
        },
    }
}
