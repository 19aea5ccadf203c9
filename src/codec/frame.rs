use super::CodecError;
use super::primitives::{concat, encode_u16_le};

const SHORT_FRAME_HEADER_LEN: usize = 4;
const SHORT_FRAME_MAX_PAYLOAD_LEN: usize = u16::MAX as usize - SHORT_FRAME_HEADER_LEN;

/// Encoder for the device's length-prefixed command frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes `[len_lo, len_hi, command_id, command_ns, payload...]`.
    ///
    /// The length counts the whole frame, header included.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame would not fit a 16-bit length.
    ///
    /// ```
    /// use idm_link::FrameCodec;
    ///
    /// let frame = FrameCodec::encode_short(0x07, 0x01, &[0x01])?;
    /// assert_eq!(vec![0x05, 0x00, 0x07, 0x01, 0x01], frame);
    /// # Ok::<(), idm_link::CodecError>(())
    /// ```
    pub fn encode_short(
        command_id: u8,
        command_ns: u8,
        payload: &[u8],
    ) -> Result<Vec<u8>, CodecError> {
        if payload.len() > SHORT_FRAME_MAX_PAYLOAD_LEN {
            return Err(CodecError::ShortFramePayloadTooLarge {
                payload_len: payload.len(),
                max_payload_len: SHORT_FRAME_MAX_PAYLOAD_LEN,
            });
        }

        let frame_len = encode_u16_le(SHORT_FRAME_HEADER_LEN + payload.len());
        Ok(concat(&[&frame_len, &[command_id, command_ns], payload]))
    }
}
