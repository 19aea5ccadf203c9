use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::codec::{CodecError, FrameCodec};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::send_frame;

/// Countdown timer control.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CountdownAction {
    Stop = 0,
    Start = 1,
    Pause = 2,
    Restart = 3,
}

/// Stopwatch control.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChronographAction {
    Reset = 0,
    Start = 1,
    Pause = 2,
    Resume = 3,
}

/// Handler for the countdown timer.
pub struct CountdownHandler;

impl CountdownHandler {
    /// `[7, 0, 8, 128, action, minutes, seconds]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn frame_for(
        action: CountdownAction,
        minutes: u8,
        seconds: u8,
    ) -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(0x08, 0x80, &[action as u8, minutes, seconds])
    }

    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn set_countdown(
        transport: &dyn Transport,
        action: CountdownAction,
        minutes: u8,
        seconds: u8,
    ) -> Result<(), ProtocolError> {
        send_frame(
            transport,
            &Self::frame_for(action, minutes, seconds)?,
            WriteMode::WithoutResponse,
        )
        .await
    }
}

/// Handler for the stopwatch.
pub struct ChronographHandler;

impl ChronographHandler {
    /// `[5, 0, 9, 128, action]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn frame_for(action: ChronographAction) -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(0x09, 0x80, &[action as u8])
    }

    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn set_chronograph(
        transport: &dyn Transport,
        action: ChronographAction,
    ) -> Result<(), ProtocolError> {
        send_frame(
            transport,
            &Self::frame_for(action)?,
            WriteMode::WithoutResponse,
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
    #[case(CountdownAction::Stop, 0, 0, vec![7, 0, 8, 128, 0, 0, 0])]
    #[case(CountdownAction::Start, 5, 30, vec![7, 0, 8, 128, 1, 5, 30])]
    #[case(CountdownAction::Restart, 99, 59, vec![7, 0, 8, 128, 3, 99, 59])]
    fn countdown_frame_matches_protocol(
        #[case] action: CountdownAction,
        #[case] minutes: u8,
        #[case] seconds: u8,
        #[case] expected: Vec<u8>,
    ) {
        let frame = CountdownHandler::frame_for(action, minutes, seconds)
            .expect("countdown frame should encode");
        assert_eq!(expected, frame);
    }

    #[rstest]
    #[case(ChronographAction::Reset, 0)]
    #[case(ChronographAction::Start, 1)]
    #[case(ChronographAction::Pause, 2)]
    #[case(ChronographAction::Resume, 3)]
    fn chronograph_frame_carries_action(#[case] action: ChronographAction, #[case] byte: u8) {
        let frame =
            ChronographHandler::frame_for(action).expect("chronograph frame should encode");
        assert_eq!(vec![5, 0, 9, 128, byte], frame);
    }
}
