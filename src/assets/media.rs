use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ClipframeError, ClipframeResult};
use crate::foundation::process::output_with_timeout;

/// Metadata extracted from a source clip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File that was probed.
    pub source_path: PathBuf,
    /// Container duration in seconds. Always finite and `> 0`.
    pub duration_secs: f64,
    /// Width of the first video stream in pixels.
    pub width: u32,
    /// Height of the first video stream in pixels.
    pub height: u32,
    /// Frame rate of the first video stream, when reported.
    pub fps: Option<f64>,
    /// Codec of the first video stream, when reported.
    pub video_codec: Option<String>,
    /// Whether at least one audio stream exists.
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe `path` with `ffprobe`, killing the probe once `timeout` elapses.
///
/// Any failure (missing file, missing binary, timeout, unparsable output, absent or non-positive
/// duration) is reported as [`ClipframeError::Probe`].
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn probe_media(path: &Path, timeout: Duration) -> ClipframeResult<MediaProbe> {
    probe_with(Command::new("ffprobe"), path, timeout)
}

fn probe_with(mut cmd: Command, path: &Path, timeout: Duration) -> ClipframeResult<MediaProbe> {
    if !path.is_file() {
        return Err(ClipframeError::probe(format!(
            "'{}' is not a readable file",
            path.display()
        )));
    }

    cmd.args([
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ])
    .arg(path);

    let output = match output_with_timeout(&mut cmd, timeout) {
        Ok(Some(output)) => output,
        Ok(None) => {
            return Err(ClipframeError::probe(format!(
                "ffprobe timed out after {:.1}s",
                timeout.as_secs_f64()
            )));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ClipframeError::probe("ffprobe was not found on PATH"));
        }
        Err(e) => return Err(ClipframeError::probe(format!("failed to run ffprobe: {e}"))),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClipframeError::probe(format!(
            "ffprobe exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let probe = parse_ffprobe_json(&output.stdout, path)?;
    tracing::debug!(
        duration_secs = probe.duration_secs,
        width = probe.width,
        height = probe.height,
        has_audio = probe.has_audio,
        "probed source clip"
    );
    Ok(probe)
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub(crate) fn parse_ffprobe_json(bytes: &[u8], path: &Path) -> ClipframeResult<MediaProbe> {
    let parsed: FfprobeOutput = serde_json::from_slice(bytes)
        .map_err(|e| ClipframeError::probe(format!("failed to parse ffprobe output: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ClipframeError::probe("no video stream found"))?;
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let width = video.width.unwrap_or(0);
    let height = video.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(ClipframeError::probe("video stream has no dimensions"));
    }

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| parse_secs(f.duration.as_deref()))
        .or_else(|| parse_secs(video.duration.as_deref()))
        .ok_or_else(|| ClipframeError::probe("ffprobe reported no duration"))?;
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(ClipframeError::probe(format!(
            "ffprobe reported an unusable duration: {duration_secs}"
        )));
    }

    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_frame_rate));

    Ok(MediaProbe {
        source_path: path.to_path_buf(),
        duration_secs,
        width,
        height,
        fps,
        video_codec: video.codec_name.clone(),
        has_audio,
    })
}

fn parse_secs(s: Option<&str>) -> Option<f64> {
    s?.trim().parse::<f64>().ok()
}

/// Parse an `ffprobe` rate like `30000/1001` or `25`.
pub(crate) fn parse_frame_rate(s: &str) -> Option<f64> {
    let v = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.trim().parse().ok()?,
    };
    (v.is_finite() && v > 0.0).then_some(v)
}

/// Return `true` when `tool -version` runs successfully.
pub(crate) fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
