use strum_macros::{Display, EnumString};

use crate::codec::{CodecError, FrameCodec};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::send_frame;

/// Screen power state.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ScreenPower {
    Off,
    On,
}

impl From<bool> for ScreenPower {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

/// Handler for the screen power command.
pub struct PowerHandler;

impl PowerHandler {
    /// `[5, 0, 7, 1, on]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame; the signature matches the other builders.
    pub fn frame_for(power: ScreenPower) -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(0x07, 0x01, &[u8::from(power == ScreenPower::On)])
    }

    /// Turns the panel on or off.
    ///
    /// ```
    /// # async fn demo(transport: &dyn idm_link::Transport) -> Result<(), idm_link::ProtocolError> {
    /// use idm_link::{PowerHandler, ScreenPower};
    ///
    /// PowerHandler::set_power(transport, ScreenPower::On).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn set_power(
        transport: &dyn Transport,
        power: ScreenPower,
    ) -> Result<(), ProtocolError> {
        send_frame(transport, &Self::frame_for(power)?, WriteMode::WithResponse).await
    }
}
