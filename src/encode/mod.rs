//! Encoding sinks.
//!
//! Sinks consume rasterized frames in timeline order and are driven by the render orchestrator.

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
