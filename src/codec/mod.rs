mod chunking;
mod frame;
pub(crate) mod primitives;

use thiserror::Error;

pub use chunking::{
    AnimationChunkHeader, ChunkStream, Chunker, ContinuationFlag, ImageChunkHeader, Slice,
};
pub use frame::FrameCodec;
pub use primitives::{concat, crc32, encode_u16_le, encode_u32_le, split_fixed};

/// Errors returned by the pure encoders.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CodecError {
    /// A fixed-size split was requested with a zero slice size.
    #[error("slice size must be greater than zero")]
    ZeroSliceSize,
    /// The payload is too large to fit in a 16-bit short-frame length field.
    #[error("short frame payload is too large: {payload_len} bytes exceeds max {max_payload_len}")]
    ShortFramePayloadTooLarge {
        payload_len: usize,
        max_payload_len: usize,
    },
    /// A chunk-stream payload does not fit the 32-bit total-length field.
    #[error("payload of {payload_len} bytes does not fit a 32-bit length field")]
    PayloadTooLarge { payload_len: usize },
    /// Effect commands carry between 2 and 7 colours.
    #[error("effect needs 2 to 7 colours, got {count}")]
    EffectColourCount { count: usize },
    /// Text commands need at least one character.
    #[error("text command needs at least one character")]
    EmptyText,
    /// Graffiti commands carry at most 255 pixels.
    #[error("graffiti batch has {count} pixels; at most {max} fit one command")]
    GraffitiBatchTooLarge { count: usize, max: usize },
}
