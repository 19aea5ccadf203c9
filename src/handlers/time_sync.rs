use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::codec::{CodecError, FrameCodec};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::send_frame;

/// Handler for setting the device clock.
pub struct TimeSyncHandler;

impl TimeSyncHandler {
    /// `[yy, mm, dd, weekday (Monday = 1), hh, mm, ss]`
    fn payload_for(timestamp: OffsetDateTime) -> [u8; 7] {
        // rem_euclid keeps the value in 0..100, so the conversion cannot fail.
        let year = u8::try_from(timestamp.year().rem_euclid(100)).unwrap_or_default();
        [
            year,
            u8::from(timestamp.month()),
            timestamp.day(),
            timestamp.weekday().number_from_monday(),
            timestamp.hour(),
            timestamp.minute(),
            timestamp.second(),
        ]
    }

    /// `[11, 0, 1, 128, yy, mm, dd, weekday, hh, mm, ss]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn frame_for(timestamp: OffsetDateTime) -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(0x01, 0x80, &Self::payload_for(timestamp))
    }

    /// Local wall-clock time, or UTC when the local offset cannot be determined.
    #[must_use]
    pub fn now() -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|error| {
            debug!(%error, "local offset unavailable, syncing in UTC");
            OffsetDateTime::now_utc()
        })
    }

    /// Sends `timestamp` as the device's wall-clock time.
    ///
    /// ```
    /// # async fn demo(transport: &dyn idm_link::Transport) -> Result<(), idm_link::ProtocolError> {
    /// use idm_link::TimeSyncHandler;
    ///
    /// TimeSyncHandler::sync_time(transport, TimeSyncHandler::now()).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the link write fails.
    #[instrument(
        skip(transport),
        level = "debug",
        fields(unix_timestamp = timestamp.unix_timestamp())
    )]
    pub async fn sync_time(
        transport: &dyn Transport,
        timestamp: OffsetDateTime,
    ) -> Result<(), ProtocolError> {
        send_frame(transport, &Self::frame_for(timestamp)?, WriteMode::WithResponse).await
    }
}
