use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Errors returned when parsing a hex colour.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColourParseError {
    #[error("colour `{value}` must be six hex digits, optionally prefixed with `#`")]
    InvalidLength { value: String },
    #[error("colour `{value}` is not valid hex")]
    InvalidHex {
        value: String,
        #[source]
        source: hex::FromHexError,
    },
}

/// 24-bit colour as sent on the wire.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Self = Self::new(0xFF, 0xFF, 0xFF);
    pub const BLACK: Self = Self::new(0x00, 0x00, 0x00);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels in wire order.
    #[must_use]
    pub fn bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl FromStr for Rgb {
    type Err = ColourParseError;

    /// Parses `rrggbb` or `#rrggbb`.
    ///
    /// ```
    /// use idm_link::Rgb;
    ///
    /// let colour: Rgb = "#ff8800".parse()?;
    /// assert_eq!(Rgb::new(0xFF, 0x88, 0x00), colour);
    /// # Ok::<(), idm_link::ColourParseError>(())
    /// ```
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = value.trim().trim_start_matches('#');
        let mut channels = [0u8; 3];
        if digits.len() != 6 {
            return Err(ColourParseError::InvalidLength {
                value: value.to_string(),
            });
        }
        hex::decode_to_slice(digits, &mut channels).map_err(|source| {
            ColourParseError::InvalidHex {
                value: value.to_string(),
                source,
            }
        })?;
        let [r, g, b] = channels;
        Ok(Self::new(r, g, b))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("ffffff", Rgb::WHITE)]
    #[case("#000000", Rgb::BLACK)]
    #[case(" 12AbEf ", Rgb::new(0x12, 0xAB, 0xEF))]
    fn parses_hex_colours(#[case] input: &str, #[case] expected: Rgb) {
        assert_eq!(expected, input.parse::<Rgb>().expect("colour should parse"));
    }

    #[test]
    fn rejects_short_colours() {
        assert_matches!(
            "fff".parse::<Rgb>(),
            Err(ColourParseError::InvalidLength { .. })
        );
    }

    #[test]
    fn rejects_non_hex_digits() {
        assert_matches!(
            "gg0000".parse::<Rgb>(),
            Err(ColourParseError::InvalidHex { .. })
        );
    }
}
