use serde::Serialize;
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// Supported square panel sizes.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Display, EnumString, Serialize)]
pub enum ScreenSize {
    #[strum(serialize = "16")]
    #[serde(rename = "16")]
    Size16,
    #[default]
    #[strum(serialize = "32")]
    #[serde(rename = "32")]
    Size32,
    #[strum(serialize = "64")]
    #[serde(rename = "64")]
    Size64,
}

impl ScreenSize {
    /// Edge length in pixels.
    ///
    /// ```
    /// use idm_link::ScreenSize;
    ///
    /// assert_eq!(64, ScreenSize::Size64.side());
    /// assert_eq!(Ok(ScreenSize::Size16), "16".parse());
    /// ```
    #[must_use]
    pub const fn side(self) -> u16 {
        match self {
            Self::Size16 => 16,
            Self::Size32 => 32,
            Self::Size64 => 64,
        }
    }

    /// Bytes in one RGB888 frame for this panel.
    #[must_use]
    pub const fn rgb888_len(self) -> usize {
        let side = self.side() as usize;
        side * side * 3
    }
}

/// Errors returned when validating an RGB888 framebuffer payload.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum Rgb888FrameError {
    /// The payload length does not match `side * side * 3`.
    #[error(
        "rgb888 payload length mismatch for a {size}x{size} panel: expected {expected_len} bytes, got {actual_len}"
    )]
    LengthMismatch {
        size: ScreenSize,
        expected_len: usize,
        actual_len: usize,
    },
}

/// Validated, already-resized RGB888 framebuffer for one panel.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Rgb888Frame {
    size: ScreenSize,
    payload: Vec<u8>,
}

impl Rgb888Frame {
    #[must_use]
    pub fn size(&self) -> ScreenSize {
        self.size
    }

    /// Returns the row-major RGB bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl TryFrom<(ScreenSize, Vec<u8>)> for Rgb888Frame {
    type Error = Rgb888FrameError;

    /// Validates the payload length against the panel size.
    ///
    /// ```
    /// use idm_link::{Rgb888Frame, ScreenSize};
    ///
    /// let frame = Rgb888Frame::try_from((ScreenSize::Size16, vec![0x20; 768]))?;
    /// assert_eq!(768, frame.payload().len());
    /// # Ok::<(), idm_link::Rgb888FrameError>(())
    /// ```
    fn try_from(value: (ScreenSize, Vec<u8>)) -> Result<Self, Self::Error> {
        let (size, payload) = value;
        let expected_len = size.rgb888_len();
        if payload.len() != expected_len {
            return Err(Rgb888FrameError::LengthMismatch {
                size,
                expected_len,
                actual_len: payload.len(),
            });
        }

        Ok(Self { size, payload })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ScreenSize::Size16, 768)]
    #[case(ScreenSize::Size32, 3072)]
    #[case(ScreenSize::Size64, 12_288)]
    fn rgb888_len_matches_panel(#[case] size: ScreenSize, #[case] expected: usize) {
        assert_eq!(expected, size.rgb888_len());
    }

    #[rstest]
    #[case(0usize)]
    #[case(3071usize)]
    #[case(3073usize)]
    fn try_from_rejects_non_matching_len(#[case] payload_len: usize) {
        let result = Rgb888Frame::try_from((ScreenSize::Size32, vec![0x00; payload_len]));

        assert_matches!(
            result,
            Err(Rgb888FrameError::LengthMismatch {
                size: ScreenSize::Size32,
                expected_len: 3072,
                actual_len,
            }) if actual_len == payload_len
        );
    }

    #[test]
    fn screen_size_rejects_unknown_sizes() {
        assert!("48".parse::<ScreenSize>().is_err());
    }
}
