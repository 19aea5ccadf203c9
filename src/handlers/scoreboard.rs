use crate::codec::{CodecError, FrameCodec, encode_u16_le};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::send_frame;

/// Highest value a scoreboard counter shows.
pub const MAX_SCORE: u16 = 999;

/// Handler for the two-counter scoreboard.
pub struct ScoreboardHandler;

impl ScoreboardHandler {
    /// `[8, 0, 10, 128, left_lo, left_hi, right_lo, right_hi]`, counters clamped to 999.
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn frame_for(left: u16, right: u16) -> Result<Vec<u8>, CodecError> {
        let [left_lo, left_hi] = encode_u16_le(usize::from(left.min(MAX_SCORE)));
        let [right_lo, right_hi] = encode_u16_le(usize::from(right.min(MAX_SCORE)));
        FrameCodec::encode_short(0x0A, 0x80, &[left_lo, left_hi, right_lo, right_hi])
    }

    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn set_scores(
        transport: &dyn Transport,
        left: u16,
        right: u16,
    ) -> Result<(), ProtocolError> {
        send_frame(
            transport,
            &Self::frame_for(left, right)?,
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
    use crate::handlers::test_support::connected_fake;
    use crate::transport::RecordedWrite;

    #[rstest]
    #[case(0, 0, vec![8, 0, 10, 128, 0, 0, 0, 0])]
    #[case(300, 7, vec![8, 0, 10, 128, 0x2C, 0x01, 7, 0])]
    #[case::clamped(1_000, u16::MAX, vec![8, 0, 10, 128, 0xE7, 0x03, 0xE7, 0x03])]
    fn frame_encodes_counters_low_byte_first(
        #[case] left: u16,
        #[case] right: u16,
        #[case] expected: Vec<u8>,
    ) {
        let frame = ScoreboardHandler::frame_for(left, right).expect("score frame should encode");
        assert_eq!(expected, frame);
    }

    #[tokio::test]
    async fn scores_are_sent_without_acknowledgement() {
        let (transport, journal) = connected_fake().await;

        ScoreboardHandler::set_scores(&transport, 3, 1)
            .await
            .expect("scores should send");

        assert_eq!(
            vec![RecordedWrite {
                bytes: vec![8, 0, 10, 128, 3, 0, 1, 0],
                mode: WriteMode::WithoutResponse,
            }],
            journal.writes()
        );
    }
}
