use bon::Builder;

use crate::codec::{CodecError, FrameCodec};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::send_frame;

/// Nightly dimming window.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct EcoSchedule {
    #[builder(default = true)]
    enabled: bool,
    start_hour: u8,
    start_minute: u8,
    end_hour: u8,
    end_minute: u8,
    /// Brightness percent applied inside the window, sent unclamped.
    brightness: u8,
}

/// Handler for the eco-mode schedule.
pub struct EcoHandler;

impl EcoHandler {
    /// `[10, 0, 2, 128, enabled, start_h, start_m, end_h, end_m, brightness]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn frame_for(schedule: EcoSchedule) -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(
            0x02,
            0x80,
            &[
                u8::from(schedule.enabled),
                schedule.start_hour,
                schedule.start_minute,
                schedule.end_hour,
                schedule.end_minute,
                schedule.brightness,
            ],
        )
    }

    /// ```
    /// # async fn demo(transport: &dyn idm_link::Transport) -> Result<(), idm_link::ProtocolError> {
    /// use idm_link::{EcoHandler, EcoSchedule};
    ///
    /// let schedule = EcoSchedule::builder()
    ///     .start_hour(22)
    ///     .start_minute(0)
    ///     .end_hour(7)
    ///     .end_minute(30)
    ///     .brightness(10)
    ///     .build();
    /// EcoHandler::set_schedule(transport, schedule).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn set_schedule(
        transport: &dyn Transport,
        schedule: EcoSchedule,
    ) -> Result<(), ProtocolError> {
        send_frame(
            transport,
            &Self::frame_for(schedule)?,
            WriteMode::WithoutResponse,
        )
        .await
    }
}
