use crate::codec::{CodecError, FrameCodec};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::send_frame;

/// Handler for the DIY drawing mode switch that precedes image uploads.
pub struct DiyModeHandler;

impl DiyModeHandler {
    /// `[5, 0, 4, 1, enabled]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn frame_for(enabled: bool) -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(0x04, 0x01, &[u8::from(enabled)])
    }

    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn set_enabled(transport: &dyn Transport, enabled: bool) -> Result<(), ProtocolError> {
        send_frame(transport, &Self::frame_for(enabled)?, WriteMode::WithResponse).await
    }
}
