use crate::codec::{CodecError, FrameCodec};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::{Rgb, send_frame};

/// Handler for full-screen colour fill commands.
pub struct FullscreenColourHandler;

impl FullscreenColourHandler {
    /// `[7, 0, 2, 2, r, g, b]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn frame_for(colour: Rgb) -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(0x02, 0x02, &colour.bytes())
    }

    /// Fills the panel with a single colour.
    ///
    /// ```
    /// # async fn demo(transport: &dyn idm_link::Transport) -> Result<(), idm_link::ProtocolError> {
    /// use idm_link::{FullscreenColourHandler, Rgb};
    ///
    /// FullscreenColourHandler::set_colour(transport, Rgb::new(255, 0, 0)).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn set_colour(transport: &dyn Transport, colour: Rgb) -> Result<(), ProtocolError> {
        send_frame(transport, &Self::frame_for(colour)?, WriteMode::WithResponse).await
    }
}
