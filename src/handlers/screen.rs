use crate::codec::{CodecError, FrameCodec};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::send_frame;

/// Whole-screen commands without parameters beyond a flag.
pub struct ScreenHandler;

impl ScreenHandler {
    /// `[5, 0, 6, 128, flipped]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn flip_frame(flipped: bool) -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(0x06, 0x80, &[u8::from(flipped)])
    }

    /// `[4, 0, 3, 0]`: toggles freezing the current image.
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn freeze_frame() -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(0x03, 0x00, &[])
    }

    /// `[4, 0, 3, 128]`
    ///
    /// # Errors
    ///
    /// Never fails for this fixed-size frame.
    pub fn reset_frame() -> Result<Vec<u8>, CodecError> {
        FrameCodec::encode_short(0x03, 0x80, &[])
    }

    /// Rotates the picture by 180 degrees, or back.
    ///
    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn set_flipped(transport: &dyn Transport, flipped: bool) -> Result<(), ProtocolError> {
        send_frame(transport, &Self::flip_frame(flipped)?, WriteMode::WithResponse).await
    }

    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn freeze(transport: &dyn Transport) -> Result<(), ProtocolError> {
        send_frame(transport, &Self::freeze_frame()?, WriteMode::WithResponse).await
    }

    /// # Errors
    ///
    /// Returns an error when the link write fails.
    pub async fn reset(transport: &dyn Transport) -> Result<(), ProtocolError> {
        send_frame(transport, &Self::reset_frame()?, WriteMode::WithResponse).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::handlers::test_support::connected_fake;

    #[rstest]
    #[case(false, vec![5, 0, 6, 128, 0])]
    #[case(true, vec![5, 0, 6, 128, 1])]
    fn flip_frame_matches_protocol(#[case] flipped: bool, #[case] expected: Vec<u8>) {
        assert_eq!(
            expected,
            ScreenHandler::flip_frame(flipped).expect("flip frame should encode")
        );
    }

    #[test]
    fn freeze_and_reset_frames_match_protocol() {
        assert_eq!(
            vec![4, 0, 3, 0],
            ScreenHandler::freeze_frame().expect("freeze frame should encode")
        );
        assert_eq!(
            vec![4, 0, 3, 128],
            ScreenHandler::reset_frame().expect("reset frame should encode")
        );
    }

    #[tokio::test]
    async fn commands_reach_the_link_in_order() {
        let (transport, journal) = connected_fake().await;

        ScreenHandler::freeze(&transport).await.expect("freeze should send");
        ScreenHandler::reset(&transport).await.expect("reset should send");

        let sent: Vec<Vec<u8>> = journal.writes().into_iter().map(|write| write.bytes).collect();
        assert_eq!(vec![vec![4, 0, 3, 0], vec![4, 0, 3, 128]], sent);
    }
}
