use crate::codec::{CodecError, FrameCodec};
use crate::error::ProtocolError;
use crate::transport::{Transport, WriteMode};

use super::{Rgb, send_frame};

/// Largest pixel batch one graffiti command carries.
pub const MAX_GRAFFITI_PIXELS: usize = 255;

/// Panel coordinate, origin top-left.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Pixel {
    pub x: u8,
    pub y: u8,
}

impl Pixel {
    #[must_use]
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

/// Handler for painting individual pixels.
pub struct GraffitiHandler;

impl GraffitiHandler {
    /// `[len_lo, len_hi, 5, 1, 0, r, g, b]` followed by one `(x, y)` pair per pixel.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::GraffitiBatchTooLarge`] above 255 pixels.
    pub fn frame_for(colour: Rgb, pixels: &[Pixel]) -> Result<Vec<u8>, CodecError> {
        if pixels.len() > MAX_GRAFFITI_PIXELS {
            return Err(CodecError::GraffitiBatchTooLarge {
                count: pixels.len(),
                max: MAX_GRAFFITI_PIXELS,
            });
        }

        let mut payload = Vec::with_capacity(4 + pixels.len() * 2);
        payload.push(0x00);
        payload.extend_from_slice(&colour.bytes());
        for pixel in pixels {
            payload.extend_from_slice(&[pixel.x, pixel.y]);
        }
        FrameCodec::encode_short(0x05, 0x01, &payload)
    }

    /// Splits any number of pixels into successive commands of at most 255 pixels.
    ///
    /// ```
    /// use idm_link::{GraffitiHandler, Pixel, Rgb};
    ///
    /// let pixels: Vec<Pixel> = (0..=255).map(|x| Pixel::new(x, 0)).collect();
    /// let frames = GraffitiHandler::frames_for(Rgb::WHITE, &pixels)?;
    /// assert_eq!(2, frames.len());
    /// # Ok::<(), idm_link::CodecError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Propagates frame encoding failures.
    pub fn frames_for(colour: Rgb, pixels: &[Pixel]) -> Result<Vec<Vec<u8>>, CodecError> {
        pixels
            .chunks(MAX_GRAFFITI_PIXELS)
            .map(|batch| Self::frame_for(colour, batch))
            .collect()
    }

    /// Paints `pixels`, one command per batch of 255.
    ///
    /// # Errors
    ///
    /// Returns an error when a link write fails; earlier batches stay painted.
    pub async fn paint(
        transport: &dyn Transport,
        colour: Rgb,
        pixels: &[Pixel],
    ) -> Result<(), ProtocolError> {
        for frame in Self::frames_for(colour, pixels)? {
            send_frame(transport, &frame, WriteMode::WithResponse).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::handlers::test_support::connected_fake;

    #[test]
    fn frame_matches_protocol() {
        let frame = GraffitiHandler::frame_for(
            Rgb::new(0xAA, 0xBB, 0xCC),
            &[Pixel::new(1, 2), Pixel::new(31, 30)],
        )
        .expect("graffiti frame should encode");
        assert_eq!(vec![12, 0, 5, 1, 0, 0xAA, 0xBB, 0xCC, 1, 2, 31, 30], frame);
    }

    #[test]
    fn full_batch_uses_two_length_bytes() {
        let pixels = vec![Pixel::new(3, 4); MAX_GRAFFITI_PIXELS];
        let frame = GraffitiHandler::frame_for(Rgb::BLACK, &pixels)
            .expect("full batch should encode");
        assert_eq!(8 + 2 * MAX_GRAFFITI_PIXELS, frame.len());
        assert_eq!([0x06, 0x02], [frame[0], frame[1]]);
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let pixels = vec![Pixel::new(0, 0); MAX_GRAFFITI_PIXELS + 1];
        assert_matches!(
            GraffitiHandler::frame_for(Rgb::WHITE, &pixels),
            Err(CodecError::GraffitiBatchTooLarge { count: 256, max: 255 })
        );
    }

    #[tokio::test]
    async fn paint_splits_large_edits_into_batches() {
        let (transport, journal) = connected_fake().await;
        let pixels: Vec<Pixel> = (0..300_u16)
            .map(|index| Pixel::new((index % 32) as u8, (index / 32) as u8))
            .collect();

        GraffitiHandler::paint(&transport, Rgb::WHITE, &pixels)
            .await
            .expect("paint should send");

        let lengths: Vec<usize> = journal
            .writes()
            .iter()
            .map(|write| write.bytes.len())
            .collect();
        assert_eq!(vec![509, 9, 98], lengths);
    }
}
