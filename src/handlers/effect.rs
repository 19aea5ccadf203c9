use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::codec::{CodecError, concat};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::{Rgb, send_frame};

const EFFECT_SPEED: u8 = 90;
const MIN_COLOURS: usize = 2;
const MAX_COLOURS: usize = 7;

/// Animated colour effects.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumString, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EffectStyle {
    HorizontalRainbow = 0,
    RandomPixels = 1,
    RandomColouredPixels = 2,
    VerticalRainbow = 3,
    DiagonalRightRainbow = 4,
    DiagonalLeftRainbow = 5,
    RandomColourBlocks = 6,
}

/// Handler for the colour effect command.
pub struct EffectHandler;

impl EffectHandler {
    /// `[6 + n, 0, 3, 2, style, 90, n]` followed by `n` RGB triples.
    ///
    /// The declared length is `6 + n` even though `7 + 3n` bytes follow;
    /// the panel expects exactly this.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EffectColourCount`] unless `colours` holds 2 to 7 entries.
    ///
    /// ```
    /// use idm_link::{EffectHandler, EffectStyle, Rgb};
    ///
    /// let frame = EffectHandler::frame_for(EffectStyle::VerticalRainbow, &[Rgb::WHITE, Rgb::BLACK])?;
    /// assert_eq!(8, frame[0]);
    /// assert_eq!(13, frame.len());
    /// # Ok::<(), idm_link::CodecError>(())
    /// ```
    pub fn frame_for(style: EffectStyle, colours: &[Rgb]) -> Result<Vec<u8>, CodecError> {
        let count = colours.len();
        if !(MIN_COLOURS..=MAX_COLOURS).contains(&count) {
            return Err(CodecError::EffectColourCount { count });
        }

        // count <= 7, so neither byte can truncate.
        #[allow(clippy::cast_possible_truncation)]
        let header = [6 + count as u8, 0x00, 0x03, 0x02, style as u8, EFFECT_SPEED, count as u8];
        let triples: Vec<u8> = colours.iter().flat_map(|colour| colour.bytes()).collect();
        Ok(concat(&[&header, &triples]))
    }

    /// # Errors
    ///
    /// Returns an error for an unsupported colour count or when the link write fails.
    pub async fn show_effect(
        transport: &dyn Transport,
        style: EffectStyle,
        colours: &[Rgb],
    ) -> Result<(), ProtocolError> {
        send_frame(
            transport,
            &Self::frame_for(style, colours)?,
            WriteMode::WithoutResponse,
        )
        .await
    }
}
