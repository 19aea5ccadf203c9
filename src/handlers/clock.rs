use bon::Builder;
use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString};

use crate::codec::{CodecError, FrameCodec};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::{Rgb, send_frame};

const STYLE_MASK: u8 = 0x3F;
const SHOW_DATE_FLAG: u8 = 0x80;
const HOUR_24_FLAG: u8 = 0x40;

/// Built-in clock faces.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Display, EnumIter, EnumString, Serialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ClockStyle {
    #[default]
    RgbSwipeOutline = 0,
    ChristmasTree = 1,
    Checkers = 2,
    Colour = 3,
    Hourglass = 4,
    AlarmClock = 5,
    Outlines = 6,
    RgbCorners = 7,
}

/// Parameters of the clock display command.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct ClockOptions {
    #[builder(default)]
    style: ClockStyle,
    #[builder(default = true)]
    show_date: bool,
    #[builder(default = true)]
    hour_24: bool,
    #[builder(default = Rgb::WHITE)]
    colour: Rgb,
}

impl ClockOptions {
    fn flags(self) -> u8 {
        let mut flags = (self.style as u8) & STYLE_MASK;
        if self.show_date {
            flags |= SHOW_DATE_FLAG;
        }
        if self.hour_24 {
            flags |= HOUR_24_FLAG;
        }
        flags
    }
}

/// Handler for switching the panel to a clock face.
pub struct ClockHandler;

impl ClockHandler {
    /// `[8, 0, 6, 1, flags, r, g, b]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn frame_for(options: ClockOptions) -> Result<Vec<u8>, CodecError> {
        let [r, g, b] = options.colour.bytes();
        FrameCodec::encode_short(0x06, 0x01, &[options.flags(), r, g, b])
    }

    /// ```
    /// # async fn demo(transport: &dyn idm_link::Transport) -> Result<(), idm_link::ProtocolError> {
    /// use idm_link::{ClockHandler, ClockOptions, ClockStyle};
    ///
    /// let options = ClockOptions::builder().style(ClockStyle::Hourglass).hour_24(false).build();
    /// ClockHandler::show_clock(transport, options).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn show_clock(
        transport: &dyn Transport,
        options: ClockOptions,
    ) -> Result<(), ProtocolError> {
        send_frame(
            transport,
            &Self::frame_for(options)?,
            WriteMode::WithoutResponse,
        )
        .await
    }
}
