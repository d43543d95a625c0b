//! Clipframe renders an uploaded clip into a fixed branded vertical template.
//!
//! Every output is a 1080x1920 MP4: the template image fills the frame, the clip is cover-fitted
//! into a fixed window, and a short label is burned in below it. The timeline length follows the
//! clip's probed duration (`floor(seconds * fps)` frames), falling back to a default when the clip
//! cannot be probed.
//!
//! - Validate a [`GenerateRequest`] (or build [`JobInputs`] directly)
//! - Build a [`RenderJob`] through a [`Pipeline`]
//! - Render it into any [`FrameSink`], or straight to MP4 via `ffmpeg`
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Images, fonts, probing and video decode.
pub mod assets;
/// Template composition model.
pub mod composition;
/// Layered pipeline configuration.
pub mod config;
/// Encoding sinks.
pub mod encode;
/// Jobs, orchestration, delivery and the request boundary.
pub mod pipeline;
/// Composition preparation and rasterization.
pub mod render;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, FrameRange, Rect, Rgba8, Vec2};
pub use crate::foundation::error::{ClipframeError, ClipframeResult, ErrorKind};

pub use crate::assets::locator::SourceLocator;
pub use crate::assets::media::{MediaProbe, probe_media};
pub use crate::composition::geometry::{CanvasGeometry, LabelStyle};
pub use crate::composition::label::OverlayLabel;
pub use crate::composition::layers::{Layer, LayerList, build_layers};
pub use crate::config::PipelineConfig;
pub use crate::encode::ffmpeg::{CodecParams, FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{FrameSink, InMemorySink, KillSwitch, SinkConfig};
pub use crate::pipeline::boundary::{
    DeliveryMode, GenerateRequest, GenerateResponse, handle_generate,
};
pub use crate::pipeline::delivery::{DeliveredArtifact, deliver};
pub use crate::pipeline::job::{DurationSource, JobId, JobInputs, RenderJob};
pub use crate::pipeline::orchestrator::{EncodedArtifact, Pipeline, RenderStats};
pub use crate::render::backend::FrameRGBA;
pub use crate::render::prepare::PreparedComposition;
