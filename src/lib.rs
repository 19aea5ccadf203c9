mod app;
mod cli;
mod codec;
mod error;
mod handlers;
mod media;
mod protocol;
mod telemetry;
mod transport;

pub use app::{run, select_transport};
pub use cli::{
    Args, Command, FakeArgs, LinkMode, LinkSettings, LogLevel, SendArgs, SendCommand, WatchArgs,
};
pub use codec::{
    AnimationChunkHeader, ChunkStream, Chunker, CodecError, ContinuationFlag, FrameCodec,
    ImageChunkHeader, Slice, concat, crc32, encode_u16_le, encode_u32_le, split_fixed,
};
pub use error::{BackendError, FixtureError, LinkError, LinkErrorKind, ProtocolError, RelayCallError};
pub use handlers::{
    AnimationUploadHandler, Brightness, BrightnessHandler, ChronographAction, ChronographHandler,
    ClockHandler, ClockOptions, ClockStyle, ColourParseError, CountdownAction, CountdownHandler,
    DEFAULT_DIY_SETTLE, DiyModeHandler, EcoHandler, EcoSchedule, EffectHandler, EffectStyle,
    Font8x8Rasterizer, FullscreenColourHandler, GLYPH_BITMAP_LEN, GLYPH_HEIGHT, GLYPH_WIDTH,
    GlyphBitmap, GlyphCanvas, GlyphRasterizer, GraffitiHandler, ImageUploadHandler,
    MAX_GRAFFITI_PIXELS, MAX_SCORE, Pixel, PowerHandler, Rgb, ScoreboardHandler, ScreenHandler,
    ScreenPower, TextColourMode, TextHandler, TextMode, TextOptions, TimeSyncHandler,
    UploadReceipt,
};
pub use media::{Rgb888Frame, Rgb888FrameError, ScreenSize};
pub use protocol::{
    ANIMATION_HEADER_LEN, DEFAULT_ANIMATION_TYPE, DEVICE_NAME_PREFIX, EndpointId,
    IMAGE_HEADER_LEN, LINK_MTU, SLICE_LEN,
};
pub use transport::{
    ActiveTransport, BtleplugBackend, ConnectRequest, ConnectionState, DEFAULT_RELAY_URL,
    DirectLinkConfig, DirectLinkTransport, DiscoveredDevice, FakeLinkBackend, FakeLinkConfig,
    FakeLinkJournal, HttpRelayClient, LinkBackend, LinkSession, Observer, RecordedWrite,
    RelayApi, RelayConfig, RelayStatus, RelayTransport, ScanFixture, ScanResponse,
    SendBatchRequest, SendRequest, Transport, TransportMode, WriteMode, detect_mode,
};
