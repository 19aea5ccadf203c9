//! Byte-level building blocks shared by every command and chunk stream.

use super::CodecError;

/// Encodes the low 16 bits of `value` little-endian.
///
/// Values above `u16::MAX` wrap; the device reads only the low bits.
///
/// ```
/// assert_eq!([0x34, 0x12], idm_link::encode_u16_le(0x1234));
/// assert_eq!([0x01, 0x00], idm_link::encode_u16_le(0x1_0001));
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_u16_le(value: usize) -> [u8; 2] {
    (value as u16).to_le_bytes()
}

/// Encodes the low 32 bits of `value` little-endian.
///
/// ```
/// assert_eq!([0x78, 0x56, 0x34, 0x12], idm_link::encode_u32_le(0x1234_5678));
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_u32_le(value: usize) -> [u8; 4] {
    (value as u32).to_le_bytes()
}

/// IEEE 802.3 CRC-32 of `bytes`.
///
/// ```
/// assert_eq!(0xCBF4_3926, idm_link::crc32(b"123456789"));
/// ```
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Concatenates `parts` in order.
#[must_use]
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let total = parts.iter().map(|part| part.len()).sum();
    let mut joined = Vec::with_capacity(total);
    for part in parts {
        joined.extend_from_slice(part);
    }
    joined
}

/// Splits `bytes` into consecutive `size`-byte slices; the last one may be shorter.
///
/// # Errors
///
/// Returns [`CodecError::ZeroSliceSize`] when `size` is zero.
///
/// ```
/// let slices = idm_link::split_fixed(&[1, 2, 3, 4, 5], 2)?;
/// let expected: Vec<&[u8]> = vec![&[1, 2], &[3, 4], &[5]];
/// assert_eq!(expected, slices);
/// # Ok::<(), idm_link::CodecError>(())
/// ```
pub fn split_fixed(bytes: &[u8], size: usize) -> Result<Vec<&[u8]>, CodecError> {
    if size == 0 {
        return Err(CodecError::ZeroSliceSize);
    }
    Ok(bytes.chunks(size).collect())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, [0x00, 0x00])]
    #[case(509, [0xFD, 0x01])]
    #[case(0xFFFF, [0xFF, 0xFF])]
    #[case(0x1_0010, [0x10, 0x00])]
    fn encode_u16_le_truncates_to_low_bytes(#[case] value: usize, #[case] expected: [u8; 2]) {
        assert_eq!(expected, encode_u16_le(value));
    }

    #[test]
    fn encode_u32_le_orders_low_byte_first() {
        assert_eq!([0x00, 0x10, 0x00, 0x00], encode_u32_le(4096));
    }

    #[test]
    fn crc32_is_stable_across_calls() {
        let payload = b"matrix payload";
        assert_eq!(crc32(payload), crc32(payload));
    }

    #[test]
    fn crc32_is_order_sensitive() {
        let first: [u8; 3] = [0x01, 0x02, 0x03];
        let second: [u8; 2] = [0x0A, 0x0B];

        let forward = crc32(&concat(&[&first, &second]));
        let backward = crc32(&concat(&[&second, &first]));

        assert_ne!(forward, backward);
    }

    #[test]
    fn concat_preserves_order() {
        let parts: [&[u8]; 4] = [&[1], &[], &[2, 3], &[4]];
        assert_eq!(vec![1, 2, 3, 4], concat(&parts));
    }

    #[test]
    fn split_fixed_keeps_short_tail() {
        let bytes: Vec<u8> = (0..10).collect();
        let slices = split_fixed(&bytes, 4).expect("non-zero size should split");

        assert_eq!(vec![4, 4, 2], slices.iter().map(|s| s.len()).collect::<Vec<_>>());
        assert_eq!(bytes, slices.concat());
    }

    #[test]
    fn split_fixed_of_empty_input_is_empty() {
        let slices = split_fixed(&[], 4).expect("non-zero size should split");
        assert!(slices.is_empty());
    }

    #[test]
    fn split_fixed_rejects_zero_size() {
        assert_matches!(split_fixed(&[1, 2], 0), Err(CodecError::ZeroSliceSize));
    }
}
