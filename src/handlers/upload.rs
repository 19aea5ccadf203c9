use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, instrument};

use crate::codec::{ChunkStream, Chunker, CodecError};
use crate::error::ProtocolError;
use crate::media::Rgb888Frame;
use crate::transport::{Transport, WriteMode};

use super::DiyModeHandler;

/// Pause between enabling DIY mode and streaming an image.
pub const DEFAULT_DIY_SETTLE: Duration = Duration::from_millis(300);

/// What an upload put on the link.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct UploadReceipt {
    bytes_written: usize,
    slices_written: usize,
    fragments_written: usize,
}

impl UploadReceipt {
    fn for_stream(stream: &ChunkStream) -> Self {
        Self {
            bytes_written: stream.wire_len(),
            slices_written: stream.slices().len(),
            fragments_written: stream.fragment_count(),
        }
    }

    /// Header and payload bytes written, excluding the DIY mode switch.
    #[must_use]
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    #[must_use]
    pub fn slices_written(&self) -> usize {
        self.slices_written
    }

    #[must_use]
    pub fn fragments_written(&self) -> usize {
        self.fragments_written
    }
}

/// Uploads still images into DIY mode.
pub struct ImageUploadHandler;

impl ImageUploadHandler {
    /// Chunks a frame into 9-byte-header slices.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload does not fit the 32-bit length field.
    pub fn stream_for(frame: &Rgb888Frame, chunker: &Chunker) -> Result<ChunkStream, CodecError> {
        chunker.image_stream(frame.payload())
    }

    /// Enables DIY mode, waits [`DEFAULT_DIY_SETTLE`], then streams `frame`.
    ///
    /// ```
    /// # async fn demo(transport: &dyn idm_link::Transport) -> Result<(), idm_link::ProtocolError> {
    /// use idm_link::{ImageUploadHandler, Rgb888Frame, ScreenSize};
    ///
    /// let frame = Rgb888Frame::try_from((ScreenSize::Size32, vec![0x00; 32 * 32 * 3]))?;
    /// let receipt = ImageUploadHandler::upload(transport, &frame).await?;
    /// assert_eq!(1, receipt.slices_written());
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when chunking fails or a link write fails.
    pub async fn upload(
        transport: &dyn Transport,
        frame: &Rgb888Frame,
    ) -> Result<UploadReceipt, ProtocolError> {
        Self::upload_with(transport, frame, &Chunker::default(), DEFAULT_DIY_SETTLE).await
    }

    /// [`Self::upload`] with an explicit chunker and settle delay.
    ///
    /// # Errors
    ///
    /// Returns an error when chunking fails or a link write fails.
    #[instrument(
        skip(transport, frame, chunker),
        level = "debug",
        fields(size = %frame.size(), mtu = chunker.mtu())
    )]
    pub async fn upload_with(
        transport: &dyn Transport,
        frame: &Rgb888Frame,
        chunker: &Chunker,
        settle: Duration,
    ) -> Result<UploadReceipt, ProtocolError> {
        let stream = Self::stream_for(frame, chunker)?;
        DiyModeHandler::set_enabled(transport, true).await?;
        if !settle.is_zero() {
            sleep(settle).await;
        }
        transport.send_packets(&stream, WriteMode::WithResponse).await?;

        let receipt = UploadReceipt::for_stream(&stream);
        debug!(?receipt, "image upload finished");
        Ok(receipt)
    }
}

/// Uploads prepared animation (GIF) bytes.
pub struct AnimationUploadHandler;

impl AnimationUploadHandler {
    /// Chunks animation bytes into 16-byte-header slices sharing one CRC-32.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload does not fit the 32-bit length field.
    pub fn stream_for(animation: &[u8], chunker: &Chunker) -> Result<ChunkStream, CodecError> {
        chunker.animation_stream(animation)
    }

    /// # Errors
    ///
    /// Returns an error when chunking fails or a link write fails.
    pub async fn upload(
        transport: &dyn Transport,
        animation: &[u8],
    ) -> Result<UploadReceipt, ProtocolError> {
        Self::upload_with(transport, animation, &Chunker::default()).await
    }

    /// # Errors
    ///
    /// Returns an error when chunking fails or a link write fails.
    #[instrument(
        skip(transport, animation, chunker),
        level = "debug",
        fields(len = animation.len(), mtu = chunker.mtu())
    )]
    pub async fn upload_with(
        transport: &dyn Transport,
        animation: &[u8],
        chunker: &Chunker,
    ) -> Result<UploadReceipt, ProtocolError> {
        let stream = Self::stream_for(animation, chunker)?;
        transport.send_packets(&stream, WriteMode::WithResponse).await?;

        let receipt = UploadReceipt::for_stream(&stream);
        debug!(?receipt, "animation upload finished");
        Ok(receipt)
    }
}
