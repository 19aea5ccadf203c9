use tracing::instrument;

use crate::codec::{CodecError, FrameCodec};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::send_frame;

/// Brightness percentage accepted by the panel, clamped into `5..=100`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub struct Brightness(u8);

impl Brightness {
    pub const MIN: u8 = 5;
    pub const MAX: u8 = 100;

    /// Clamps `percent` into the accepted range.
    ///
    /// ```
    /// use idm_link::Brightness;
    ///
    /// assert_eq!(5, Brightness::clamped(0).percent());
    /// assert_eq!(60, Brightness::clamped(60).percent());
    /// assert_eq!(100, Brightness::clamped(250).percent());
    /// ```
    #[must_use]
    pub fn clamped(percent: u8) -> Self {
        Self(percent.clamp(Self::MIN, Self::MAX))
    }

    #[must_use]
    pub fn percent(self) -> u8 {
        self.0
    }
}

/// Handler for the brightness command.
pub struct BrightnessHandler;

impl BrightnessHandler {
    /// `[5, 0, 4, 128, percent]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn frame_for(brightness: Brightness) -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(0x04, 0x80, &[brightness.percent()])
    }

    /// # Errors
    ///
    /// Returns an error when the link write fails.
    #[instrument(skip(transport), level = "debug")]
    pub async fn set_brightness(
        transport: &dyn Transport,
        brightness: Brightness,
    ) -> Result<(), ProtocolError> {
        send_frame(
            transport,
            &Self::frame_for(brightness)?,
            WriteMode::WithResponse,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(5)]
    #[case(42)]
    #[case(100)]
    fn in_range_percent_is_encoded_verbatim(#[case] percent: u8) {
        let frame = BrightnessHandler::frame_for(Brightness::clamped(percent))
            .expect("brightness frame should encode");
        assert_eq!(vec![5, 0, 4, 128, percent], frame);
    }

    #[rstest]
    #[case::zero(0, 5)]
    #[case::below_floor(4, 5)]
    #[case::above_ceiling(101, 100)]
    #[case::max_byte(255, 100)]
    fn out_of_range_percent_is_clamped(#[case] percent: u8, #[case] expected: u8) {
        let frame = BrightnessHandler::frame_for(Brightness::clamped(percent))
            .expect("brightness frame should encode");
        assert_eq!(vec![5, 0, 4, 128, expected], frame);
    }
}
