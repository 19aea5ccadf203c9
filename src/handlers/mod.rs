//! One handler per device command. Each handler exposes the pure frame
//! builder used by its async `set_*` call so byte layouts stay testable
//! without a link.

mod brightness;
mod clock;
mod colour;
mod diy;
mod eco;
mod effect;
mod fullscreen_colour;
mod glyph;
mod graffiti;
mod power;
mod scoreboard;
mod screen;
mod text;
mod time_sync;
mod timers;
mod upload;

use tracing::trace;

use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

pub use self::brightness::{Brightness, BrightnessHandler};
pub use self::clock::{ClockHandler, ClockOptions, ClockStyle};
pub use self::colour::{ColourParseError, Rgb};
pub use self::diy::DiyModeHandler;
pub use self::eco::{EcoHandler, EcoSchedule};
pub use self::effect::{EffectHandler, EffectStyle};
pub use self::fullscreen_colour::FullscreenColourHandler;
pub use self::glyph::{
    Font8x8Rasterizer, GLYPH_BITMAP_LEN, GLYPH_HEIGHT, GLYPH_WIDTH, GlyphBitmap, GlyphCanvas,
    GlyphRasterizer,
};
pub use self::graffiti::{GraffitiHandler, MAX_GRAFFITI_PIXELS, Pixel};
pub use self::power::{PowerHandler, ScreenPower};
pub use self::scoreboard::{MAX_SCORE, ScoreboardHandler};
pub use self::screen::ScreenHandler;
pub use self::text::{TextColourMode, TextHandler, TextMode, TextOptions};
pub use self::time_sync::TimeSyncHandler;
pub use self::timers::{ChronographAction, ChronographHandler, CountdownAction, CountdownHandler};
pub use self::upload::{
    AnimationUploadHandler, DEFAULT_DIY_SETTLE, ImageUploadHandler, UploadReceipt,
};

/// Writes one self-contained command frame.
async fn send_frame(
    transport: &dyn Transport,
    frame: &[u8],
    mode: WriteMode,
) -> Result<(), ProtocolError> {
    trace!(frame = %hex::encode(frame), ?mode, "sending command frame");
    transport.send_bytes(frame, mode).await?;
    Ok(())
}
