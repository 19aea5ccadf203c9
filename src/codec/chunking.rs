use tracing::trace;

use super::CodecError;
use super::primitives::{concat, crc32, encode_u16_le, encode_u32_le, split_fixed};
use crate::protocol::{
    ANIMATION_HEADER_LEN, DEFAULT_ANIMATION_TYPE, IMAGE_HEADER_LEN, LINK_MTU, SLICE_LEN,
};

/// Continuation flag carried in byte 4 of every chunk header.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ContinuationFlag {
    /// First slice of a stream.
    First,
    /// Every slice after the first.
    Continuation,
}

impl ContinuationFlag {
    /// Flag for the slice at `index` within its stream.
    #[must_use]
    pub fn for_index(index: usize) -> Self {
        if index == 0 {
            Self::First
        } else {
            Self::Continuation
        }
    }

    /// Returns the protocol byte value for this flag.
    #[must_use]
    pub const fn as_protocol_byte(self) -> u8 {
        match self {
            Self::First => 0x00,
            Self::Continuation => 0x02,
        }
    }
}

/// 9-byte header preceding each image slice.
///
/// Layout: `[len_lo, len_hi, 0x00, 0x00, flag, total32 LE]`, where `len`
/// counts the slice plus this header.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ImageChunkHeader {
    pub slice_len: usize,
    pub flag: ContinuationFlag,
    pub total_len: usize,
}

impl ImageChunkHeader {
    /// Encodes the header bytes.
    ///
    /// ```
    /// use idm_link::{ContinuationFlag, ImageChunkHeader};
    ///
    /// let header = ImageChunkHeader {
    ///     slice_len: 0x1000,
    ///     flag: ContinuationFlag::Continuation,
    ///     total_len: 0x18B9,
    /// };
    /// assert_eq!(
    ///     [0x09, 0x10, 0x00, 0x00, 0x02, 0xB9, 0x18, 0x00, 0x00],
    ///     header.encode()
    /// );
    /// ```
    #[must_use]
    pub fn encode(&self) -> [u8; IMAGE_HEADER_LEN] {
        let mut header = [0u8; IMAGE_HEADER_LEN];
        header[0..2].copy_from_slice(&encode_u16_le(IMAGE_HEADER_LEN + self.slice_len));
        header[2] = 0x00;
        header[3] = 0x00;
        header[4] = self.flag.as_protocol_byte();
        header[5..9].copy_from_slice(&encode_u32_le(self.total_len));
        header
    }
}

/// 16-byte header preceding each animation slice.
///
/// Layout: `[len_lo, len_hi, 0x01, 0x00, flag, total32 LE, crc32 LE, 0x00, 0x00, type]`.
/// The CRC covers the whole animation, not the slice.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AnimationChunkHeader {
    pub slice_len: usize,
    pub flag: ContinuationFlag,
    pub total_len: usize,
    pub crc: u32,
    pub type_code: u8,
}

impl AnimationChunkHeader {
    /// Encodes the header bytes.
    ///
    /// ```
    /// use idm_link::{AnimationChunkHeader, ContinuationFlag};
    ///
    /// let header = AnimationChunkHeader {
    ///     slice_len: 0x08B9,
    ///     flag: ContinuationFlag::Continuation,
    ///     total_len: 0x18B9,
    ///     crc: 0x14CB_42DB,
    ///     type_code: 12,
    /// };
    /// assert_eq!(
    ///     [
    ///         0xC9, 0x08, 0x01, 0x00, 0x02, 0xB9, 0x18, 0x00, 0x00, 0xDB, 0x42, 0xCB, 0x14,
    ///         0x00, 0x00, 0x0C,
    ///     ],
    ///     header.encode()
    /// );
    /// ```
    #[must_use]
    pub fn encode(&self) -> [u8; ANIMATION_HEADER_LEN] {
        let mut header = [0u8; ANIMATION_HEADER_LEN];
        header[0..2].copy_from_slice(&encode_u16_le(ANIMATION_HEADER_LEN + self.slice_len));
        header[2] = 0x01;
        header[3] = 0x00;
        header[4] = self.flag.as_protocol_byte();
        header[5..9].copy_from_slice(&encode_u32_le(self.total_len));
        header[9..13].copy_from_slice(&self.crc.to_le_bytes());
        header[13] = 0x00;
        header[14] = 0x00;
        header[15] = self.type_code;
        header
    }
}

/// One header+slice "large packet", already split into link fragments.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Slice {
    header_len: usize,
    fragments: Vec<Vec<u8>>,
}

impl Slice {
    /// Fragments in transmission order.
    #[must_use]
    pub fn fragments(&self) -> &[Vec<u8>] {
        &self.fragments
    }

    /// Reassembles the large packet (header plus slice).
    #[must_use]
    pub fn large_packet(&self) -> Vec<u8> {
        self.fragments.concat()
    }

    /// Returns the slice bytes with the header stripped.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        let packet = self.large_packet();
        packet[self.header_len.min(packet.len())..].to_vec()
    }

    /// Total-length field embedded in the header.
    #[must_use]
    pub fn declared_total_len(&self) -> u32 {
        let packet = self.large_packet();
        u32::from_le_bytes([packet[5], packet[6], packet[7], packet[8]])
    }
}

/// Ordered slices of one image or animation upload.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ChunkStream {
    slices: Vec<Slice>,
}

impl ChunkStream {
    /// Slices in transmission order.
    #[must_use]
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Number of fragments across every slice.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.slices.iter().map(|slice| slice.fragments.len()).sum()
    }

    /// Number of bytes that go over the link, headers included.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.slices
            .iter()
            .flat_map(|slice| slice.fragments.iter())
            .map(Vec::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Builds chunk streams for a given link MTU.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Chunker {
    mtu: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { mtu: LINK_MTU }
    }
}

impl Chunker {
    /// Creates a chunker fragmenting at `mtu` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ZeroSliceSize`] for a zero MTU.
    pub fn new(mtu: usize) -> Result<Self, CodecError> {
        if mtu == 0 {
            return Err(CodecError::ZeroSliceSize);
        }
        Ok(Self { mtu })
    }

    /// Fragment size used by this chunker.
    #[must_use]
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// Splits an RGB payload into 9-byte-headed image slices.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload does not fit the 32-bit length field.
    pub fn image_stream(&self, payload: &[u8]) -> Result<ChunkStream, CodecError> {
        let total_len = checked_total_len(payload)?;
        self.build(payload, IMAGE_HEADER_LEN, |slice_len, flag| {
            ImageChunkHeader {
                slice_len,
                flag,
                total_len,
            }
            .encode()
            .to_vec()
        })
    }

    /// Splits an animation into 16-byte-headed slices with the default type byte.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload does not fit the 32-bit length field.
    pub fn animation_stream(&self, payload: &[u8]) -> Result<ChunkStream, CodecError> {
        self.animation_stream_with_type(payload, DEFAULT_ANIMATION_TYPE)
    }

    /// Splits an animation into 16-byte-headed slices tagged with `type_code`.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload does not fit the 32-bit length field.
    pub fn animation_stream_with_type(
        &self,
        payload: &[u8],
        type_code: u8,
    ) -> Result<ChunkStream, CodecError> {
        let total_len = checked_total_len(payload)?;
        let crc = crc32(payload);
        self.build(payload, ANIMATION_HEADER_LEN, |slice_len, flag| {
            AnimationChunkHeader {
                slice_len,
                flag,
                total_len,
                crc,
                type_code,
            }
            .encode()
            .to_vec()
        })
    }

    fn build<F>(
        &self,
        payload: &[u8],
        header_len: usize,
        header_for: F,
    ) -> Result<ChunkStream, CodecError>
    where
        F: Fn(usize, ContinuationFlag) -> Vec<u8>,
    {
        let mut slices = Vec::new();
        for (index, slice) in split_fixed(payload, SLICE_LEN)?.into_iter().enumerate() {
            let header = header_for(slice.len(), ContinuationFlag::for_index(index));
            let large_packet = concat(&[&header, slice]);
            let fragments = split_fixed(&large_packet, self.mtu)?
                .into_iter()
                .map(<[u8]>::to_vec)
                .collect();
            slices.push(Slice {
                header_len,
                fragments,
            });
        }

        trace!(
            payload_len = payload.len(),
            slice_count = slices.len(),
            mtu = self.mtu,
            "built chunk stream"
        );
        Ok(ChunkStream { slices })
    }
}

fn checked_total_len(payload: &[u8]) -> Result<usize, CodecError> {
    u32::try_from(payload.len())
        .map(|_| payload.len())
        .map_err(|_overflow| CodecError::PayloadTooLarge {
            payload_len: payload.len(),
        })
}
