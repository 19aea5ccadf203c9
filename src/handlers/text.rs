use bon::Builder;
use serde::Serialize;
use strum_macros::{Display, EnumString};
use tracing::instrument;

use crate::codec::{CodecError, concat, crc32, encode_u16_le, encode_u32_le};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::glyph::{Font8x8Rasterizer, GlyphRasterizer};
use super::{Rgb, send_frame};

const TEXT_HEADER_LEN: usize = 16;
const TEXT_TYPE_CODE: u8 = 12;
const GLYPH_SEPARATOR: [u8; 4] = [0x05, 0xFF, 0xFF, 0xFF];
const DEFAULT_SPEED: u8 = 95;

/// How the text moves across the panel.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Display, EnumString, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TextMode {
    Replace = 0,
    #[default]
    Marquee = 1,
    ReversedMarquee = 2,
    VerticalRising = 3,
    VerticalLowering = 4,
    Blinking = 5,
    Fading = 6,
    Tetris = 7,
    Filling = 8,
}

/// How the glyphs are coloured.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Display, EnumString, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TextColourMode {
    #[default]
    White = 0,
    /// Uses [`TextOptions`] `colour`.
    Rgb = 1,
    Rainbow1 = 2,
    Rainbow2 = 3,
    Rainbow3 = 4,
    Rainbow4 = 5,
}

/// Rendering parameters of the text command.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct TextOptions {
    #[builder(default)]
    mode: TextMode,
    #[builder(default = DEFAULT_SPEED)]
    speed: u8,
    #[builder(default)]
    colour_mode: TextColourMode,
    #[builder(default = Rgb::WHITE)]
    colour: Rgb,
    /// Background fill; `None` leaves the background dark.
    background: Option<Rgb>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TextOptions {
    /// `[count_lo, count_hi, 0, 1, mode, speed, colour_mode, r, g, b, bg_on, bg_r, bg_g, bg_b]`
    fn metadata(&self, char_count: usize) -> [u8; 14] {
        let [count_lo, count_hi] = encode_u16_le(char_count);
        let [r, g, b] = self.colour.bytes();
        let [bg_r, bg_g, bg_b] = self.background.unwrap_or(Rgb::BLACK).bytes();
        [
            count_lo,
            count_hi,
            0x00,
            0x01,
            self.mode as u8,
            self.speed,
            self.colour_mode as u8,
            r,
            g,
            b,
            u8::from(self.background.is_some()),
            bg_r,
            bg_g,
            bg_b,
        ]
    }
}

/// Handler for scrolling text.
pub struct TextHandler;

impl TextHandler {
    /// Builds the complete text command.
    ///
    /// The payload is the metadata block followed by a separator and a 64-byte
    /// bitmap per character. It is wrapped in a 16-byte header:
    /// `[total_lo, total_hi, 3, 0, 0, payload_len (u32 LE), crc32 (u32 LE), 0, 0, 12]`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptyText`] for an empty string.
    ///
    /// ```
    /// use idm_link::{Font8x8Rasterizer, TextHandler, TextOptions};
    ///
    /// let frame = TextHandler::frame_for("Hi", TextOptions::default(), &Font8x8Rasterizer)?;
    /// assert_eq!(16 + 14 + 2 * 68, frame.len());
    /// # Ok::<(), idm_link::CodecError>(())
    /// ```
    pub fn frame_for(
        text: &str,
        options: TextOptions,
        rasterizer: &dyn GlyphRasterizer,
    ) -> Result<Vec<u8>, CodecError> {
        let char_count = text.chars().count();
        if char_count == 0 {
            return Err(CodecError::EmptyText);
        }

        let mut payload = options.metadata(char_count).to_vec();
        for glyph in text.chars() {
            payload.extend_from_slice(&GLYPH_SEPARATOR);
            payload.extend_from_slice(rasterizer.rasterize(glyph).to_bitmap().bytes());
        }

        let header = concat(&[
            &encode_u16_le(payload.len() + TEXT_HEADER_LEN),
            &[0x03, 0x00, 0x00],
            &encode_u32_le(payload.len()),
            &crc32(&payload).to_le_bytes(),
            &[0x00, 0x00, TEXT_TYPE_CODE],
        ]);
        Ok(concat(&[&header, &payload]))
    }

    /// Shows `text` using the built-in 8×8 font.
    ///
    /// ```
    /// # async fn demo(transport: &dyn idm_link::Transport) -> Result<(), idm_link::ProtocolError> {
    /// use idm_link::{TextHandler, TextMode, TextOptions};
    ///
    /// let options = TextOptions::builder().mode(TextMode::Blinking).build();
    /// TextHandler::show_text(transport, "Hello", options).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error for empty text or when the link write fails.
    pub async fn show_text(
        transport: &dyn Transport,
        text: &str,
        options: TextOptions,
    ) -> Result<(), ProtocolError> {
        Self::show_text_with(transport, text, options, &Font8x8Rasterizer).await
    }

    /// Shows `text` drawn by a caller-supplied rasterizer.
    ///
    /// # Errors
    ///
    /// Returns an error for empty text or when the link write fails.
    #[instrument(
        skip(transport, options, rasterizer),
        level = "debug",
        fields(chars = text.chars().count())
    )]
    pub async fn show_text_with(
        transport: &dyn Transport,
        text: &str,
        options: TextOptions,
        rasterizer: &dyn GlyphRasterizer,
    ) -> Result<(), ProtocolError> {
        let frame = Self::frame_for(text, options, rasterizer)?;
        send_frame(transport, &frame, WriteMode::WithoutResponse).await
    }
}
