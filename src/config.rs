use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::encode::ffmpeg::CodecParams;
use crate::foundation::core::Fps;
use crate::foundation::error::{ClipframeError, ClipframeResult};

/// Pipeline settings.
///
/// Layering: defaults, then an optional JSON file ([`PipelineConfig::from_path`]), then
/// `CLIPFRAME_*` environment variables ([`PipelineConfig::apply_env`]), then whatever the caller
/// sets explicitly (the CLI's flags).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Output frame rate numerator (denominator is 1).
    pub fps: u32,
    /// Timeline length used when the clip cannot be probed.
    pub default_duration_secs: f64,
    /// Directory finished artifacts are written to.
    pub output_dir: PathBuf,
    /// URL prefix under which `output_dir` is served.
    pub public_prefix: String,
    /// Branded template image.
    pub template_path: PathBuf,
    /// Bold sans-serif font for the label.
    pub font_path: PathBuf,
    /// Upper bound on one `ffprobe` run.
    pub probe_timeout_secs: u64,
    /// Upper bound on one render; `0` disables the deadline.
    pub render_timeout_secs: u64,
    /// Rasterize frames on a rayon pool.
    pub parallel: bool,
    /// Pool size; `None` lets rayon decide.
    pub threads: Option<usize>,
    /// Frames rasterized per batch.
    pub chunk_size: usize,
    /// Frames buffered between rasterizer and encoder (and decoder and rasterizer).
    pub channel_capacity: usize,
    /// Encoder settings.
    pub codec: CodecParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            default_duration_secs: 10.0,
            output_dir: PathBuf::from("public/generated"),
            public_prefix: "/generated".to_string(),
            template_path: PathBuf::from("public/image/template.png"),
            font_path: PathBuf::from("assets/fonts/label-bold.ttf"),
            probe_timeout_secs: 10,
            render_timeout_secs: 600,
            parallel: true,
            threads: None,
            chunk_size: 32,
            channel_capacity: 4,
            codec: CodecParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn from_path(path: &Path) -> ClipframeResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text).map_err(|e| {
            ClipframeError::config(format!("invalid config '{}': {e}", path.display()))
        })?;
        Ok(cfg)
    }

    /// Apply `CLIPFRAME_*` overrides from the process environment.
    pub fn apply_env(self) -> ClipframeResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `CLIPFRAME_*` overrides from `lookup`.
    ///
    /// Blank values are ignored; unparsable values are a config error naming the variable.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ClipframeResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CLIPFRAME_FPS") {
            self.fps = parse_env("CLIPFRAME_FPS", &v)?;
        }
        if let Some(v) = get("CLIPFRAME_DEFAULT_DURATION_SECS") {
            self.default_duration_secs = parse_env("CLIPFRAME_DEFAULT_DURATION_SECS", &v)?;
        }
        if let Some(v) = get("CLIPFRAME_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("CLIPFRAME_PUBLIC_PREFIX") {
            self.public_prefix = v;
        }
        if let Some(v) = get("CLIPFRAME_TEMPLATE") {
            self.template_path = PathBuf::from(v);
        }
        if let Some(v) = get("CLIPFRAME_FONT") {
            self.font_path = PathBuf::from(v);
        }
        if let Some(v) = get("CLIPFRAME_PROBE_TIMEOUT_SECS") {
            self.probe_timeout_secs = parse_env("CLIPFRAME_PROBE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("CLIPFRAME_RENDER_TIMEOUT_SECS") {
            self.render_timeout_secs = parse_env("CLIPFRAME_RENDER_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("CLIPFRAME_PARALLEL") {
            self.parallel = parse_bool("CLIPFRAME_PARALLEL", &v)?;
        }
        if let Some(v) = get("CLIPFRAME_THREADS") {
            self.threads = Some(parse_env("CLIPFRAME_THREADS", &v)?);
        }
        if let Some(v) = get("CLIPFRAME_CHUNK_SIZE") {
            self.chunk_size = parse_env("CLIPFRAME_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CLIPFRAME_CRF") {
            self.codec.crf = parse_env("CLIPFRAME_CRF", &v)?;
        }
        Ok(self)
    }

    /// Reject settings no job could run with.
    pub fn validate(&self) -> ClipframeResult<()> {
        Fps::new(self.fps, 1)?;
        if !self.default_duration_secs.is_finite() || self.default_duration_secs <= 0.0 {
            return Err(ClipframeError::config(
                "default_duration_secs must be finite and > 0",
            ));
        }
        if self.probe_timeout_secs == 0 {
            return Err(ClipframeError::config("probe_timeout_secs must be > 0"));
        }
        if self.chunk_size == 0 {
            return Err(ClipframeError::config("chunk_size must be > 0"));
        }
        if self.channel_capacity == 0 {
            return Err(ClipframeError::config("channel_capacity must be > 0"));
        }
        if self.threads == Some(0) {
            return Err(ClipframeError::config("threads must be > 0 when set"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ClipframeError::config("output_dir must not be empty"));
        }
        self.codec.validate()
    }

    /// Output frame rate.
    pub fn frame_rate(&self) -> ClipframeResult<Fps> {
        Fps::new(self.fps, 1)
    }

    /// Probe timeout as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Render deadline, if enabled.
    pub fn render_timeout(&self) -> Option<Duration> {
        (self.render_timeout_secs > 0).then(|| Duration::from_secs(self.render_timeout_secs))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ClipframeResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ClipframeError::config(format!("{key}={value:?}: {e}")))
}

fn parse_bool(key: &str, value: &str) -> ClipframeResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ClipframeError::config(format!(
            "{key}={value:?}: expected a boolean"
        ))),
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
