//! Asset loading: images, fonts, media probing and streamed video decode.

/// Image decoding into premultiplied RGBA8.
pub mod decode;
/// Where a source clip lives.
pub mod locator;
/// `ffprobe` metadata extraction.
pub mod media;
/// Label text shaping via Parley.
pub mod text;
/// Streamed video frame decode via `ffmpeg`.
pub(crate) mod video_stream;
