use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::assets::locator::SourceLocator;
use crate::assets::media::{MediaProbe, probe_media};
use crate::composition::geometry::CanvasGeometry;
use crate::composition::label::OverlayLabel;
use crate::config::PipelineConfig;
use crate::encode::ffmpeg::CodecParams;
use crate::foundation::core::Fps;
use crate::foundation::error::{ClipframeError, ClipframeResult};

/// Time-based plus random job identifier: `<unix millis>-<8 hex>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Fresh identifier. Collision resistant, not cryptographically unique.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self(format!("{millis}-{:08x}", rand::random::<u32>()))
    }

    /// Identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final artifact file name.
    pub fn output_file_name(&self) -> String {
        format!("video-{}.mp4", self.0)
    }

    /// Hidden temp file name the encoder writes before the atomic rename.
    pub fn partial_file_name(&self) -> String {
        format!(".video-{}.mp4.partial", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the timeline length came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    /// `floor(probed seconds * fps)`.
    Probed,
    /// Default length, because probing failed or there was nothing to probe.
    Fallback,
}

/// The source clip as seen by one job.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceClip {
    /// Locator handed to the decoder and audio muxer; `None` renders template and label only.
    pub locator: Option<SourceLocator>,
    /// Local file used for metadata, when it differs from the locator.
    pub probe_path: Option<PathBuf>,
    /// Probe result, when probing succeeded.
    pub probe: Option<MediaProbe>,
}

impl SourceClip {
    /// Local file that can be probed: the explicit probe path, else a local locator.
    pub fn probe_target(&self) -> Option<&Path> {
        self.probe_path
            .as_deref()
            .or_else(|| self.locator.as_ref().and_then(SourceLocator::local_path))
    }

    /// `true` unless a successful probe found no audio stream.
    pub fn may_have_audio(&self) -> bool {
        self.probe.as_ref().is_none_or(|p| p.has_audio)
    }
}

/// Caller inputs for one job.
#[derive(Clone, Debug)]
pub struct JobInputs {
    /// Clip locator; `None` when no clip was supplied.
    pub video: Option<SourceLocator>,
    /// Separate local copy of the clip for probing.
    pub probe_path: Option<PathBuf>,
    /// Validated label.
    pub label: OverlayLabel,
}

/// One immutable unit of work: inputs, probe result, geometry and encode settings.
#[derive(Clone, Debug, Serialize)]
pub struct RenderJob {
    id: JobId,
    clip: SourceClip,
    label: OverlayLabel,
    geometry: CanvasGeometry,
    fps: Fps,
    duration_in_frames: u64,
    duration_source: DurationSource,
    codec: CodecParams,
    output_path: PathBuf,
}

impl RenderJob {
    /// Probe the clip, fix the timeline length and pick the output path.
    ///
    /// Probe failures never fail the build: they are logged and the default duration is used.
    #[tracing::instrument(skip_all, fields(label = %inputs.label.display()))]
    pub fn build(
        inputs: JobInputs,
        geometry: CanvasGeometry,
        cfg: &PipelineConfig,
    ) -> ClipframeResult<Self> {
        cfg.validate()?;
        geometry.validate()?;
        let fps = cfg.frame_rate()?;

        let mut clip = SourceClip {
            locator: inputs.video,
            probe_path: inputs.probe_path,
            probe: None,
        };
        let probed = match clip.probe_target() {
            Some(path) => probe_media(path, cfg.probe_timeout()),
            None if clip.locator.is_some() => Err(ClipframeError::probe(
                "network-only locator cannot be probed",
            )),
            None => Err(ClipframeError::probe("no clip supplied")),
        };
        match probed {
            Ok(p) => clip.probe = Some(p),
            Err(e) if clip.locator.is_some() => {
                tracing::warn!(error = %e, "probe failed, using default duration");
            }
            Err(e) => tracing::info!(reason = %e, "no clip to probe, using default duration"),
        }

        let (duration_in_frames, duration_source) = resolve_duration(
            clip.probe.as_ref().map(|p| p.duration_secs),
            fps,
            cfg.default_duration_secs,
        );
        let id = JobId::generate();
        let output_path = cfg.output_dir.join(id.output_file_name());
        tracing::info!(
            job = %id,
            frames = duration_in_frames,
            source = ?duration_source,
            "render job built"
        );

        Ok(Self {
            id,
            clip,
            label: inputs.label,
            geometry,
            fps,
            duration_in_frames,
            duration_source,
            codec: cfg.codec.clone(),
            output_path,
        })
    }

    /// Job identifier.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Source clip and probe result.
    pub fn clip(&self) -> &SourceClip {
        &self.clip
    }

    /// Label to draw.
    pub fn label(&self) -> &OverlayLabel {
        &self.label
    }

    /// Output geometry.
    pub fn geometry(&self) -> &CanvasGeometry {
        &self.geometry
    }

    /// Output frame rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Exact number of frames the artifact will contain.
    pub fn duration_in_frames(&self) -> u64 {
        self.duration_in_frames
    }

    /// Whether the length was probed or defaulted.
    pub fn duration_source(&self) -> DurationSource {
        self.duration_source
    }

    /// Encoder settings.
    pub fn codec(&self) -> &CodecParams {
        &self.codec
    }

    /// Final artifact path.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Temp path the encoder writes to, in the same directory as the final path.
    pub fn partial_path(&self) -> PathBuf {
        self.output_path.with_file_name(self.id.partial_file_name())
    }
}

/// Timeline length for a probed duration (or its absence).
///
/// A probed clip shorter than one frame still yields one frame; the fallback is only used when
/// there is no probed duration at all.
pub fn resolve_duration(
    probed_secs: Option<f64>,
    fps: Fps,
    default_secs: f64,
) -> (u64, DurationSource) {
    match probed_secs {
        Some(secs) if secs.is_finite() && secs > 0.0 => {
            (fps.secs_to_frames_floor(secs).max(1), DurationSource::Probed)
        }
        _ => (
            fps.secs_to_frames_floor(default_secs).max(1),
            DurationSource::Fallback,
        ),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/job.rs"]
mod tests;
