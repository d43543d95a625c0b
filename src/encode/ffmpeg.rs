use std::ffi::OsString;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};

use crate::encode::sink::{FrameSink, KillSwitch, SinkConfig};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{FrameIndex, Rgba8};
use crate::foundation::error::{ClipframeError, ClipframeResult};
use crate::foundation::math::mul_div255_u16;
use crate::foundation::process::{ChildSlot, join_drain, spawn_drain};
use crate::render::backend::FrameRGBA;

/// Codec settings for the MP4 output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecParams {
    /// `ffmpeg` video encoder name.
    pub video_codec: String,
    /// Constant rate factor (0..=51, lower is better quality).
    pub crf: u8,
    /// Output pixel format.
    pub pix_fmt: String,
    /// `ffmpeg` audio encoder name.
    pub audio_codec: String,
    /// Audio bitrate, e.g. `128k`.
    pub audio_bitrate: String,
    /// Move the `moov` atom to the front of the file.
    pub faststart: bool,
}

impl Default for CodecParams {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 23,
            pix_fmt: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            faststart: true,
        }
    }
}

impl CodecParams {
    /// Reject parameters `ffmpeg` would refuse late in the job.
    pub fn validate(&self) -> ClipframeResult<()> {
        if self.crf > 51 {
            return Err(ClipframeError::config(format!(
                "crf must be within 0..=51, got {}",
                self.crf
            )));
        }
        for (name, v) in [
            ("video_codec", &self.video_codec),
            ("pix_fmt", &self.pix_fmt),
            ("audio_codec", &self.audio_codec),
            ("audio_bitrate", &self.audio_bitrate),
        ] {
            if v.trim().is_empty() {
                return Err(ClipframeError::config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output file path. Written as MP4 regardless of extension.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha.
    pub background: Rgba8,
    /// Codec settings.
    pub codec: CodecParams,
    /// Trips the final wait on `ffmpeg`.
    pub cancel: CancelToken,
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            background: Rgba8::WHITE,
            codec: CodecParams::default(),
            cancel: CancelToken::new(),
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to stdin.
///
/// When `SinkConfig.audio_source` is set, its first audio stream (if any) is muxed in and trimmed
/// to the video duration.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: ChildSlot,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    frames_written: u64,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: ChildSlot::default(),
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
            frames_written: 0,
        }
    }

    fn take_stderr(&mut self) -> String {
        match self.stderr_drain.take().map(join_drain) {
            Some(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Some(Err(e)) => format!("<stderr unavailable: {e}>"),
            None => String::new(),
        }
    }
}

/// Build the `ffmpeg` argument list for one encode.
pub(crate) fn build_ffmpeg_args(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Vec<OsString> {
    let codec = &opts.codec;
    let size = format!("{}x{}", cfg.width, cfg.height);
    let rate = cfg.fps.ffmpeg_rate();
    let crf = codec.crf.to_string();
    let duration = format!("{:.6}", cfg.duration_secs());

    let mut args: Vec<OsString> = Vec::new();
    let mut push = |s: &str| args.push(OsString::from(s));
    push(if opts.overwrite { "-y" } else { "-n" });
    push("-nostdin");
    push("-loglevel");
    push("error");
    push("-f");
    push("rawvideo");
    push("-pix_fmt");
    push("rgba");
    push("-s");
    push(&size);
    // Input framerate for rawvideo goes before `-i`, as a rational.
    push("-r");
    push(&rate);
    push("-i");
    push("pipe:0");

    if let Some(audio) = cfg.audio_source.as_ref() {
        args.push(OsString::from("-i"));
        args.push(audio.clone());
    }

    let mut push = |s: &str| args.push(OsString::from(s));
    push("-map");
    push("0:v:0");
    if cfg.audio_source.is_some() {
        // Trailing `?` keeps sources without an audio stream valid.
        push("-map");
        push("1:a:0?");
    }
    push("-c:v");
    push(&codec.video_codec);
    push("-crf");
    push(&crf);
    push("-pix_fmt");
    push(&codec.pix_fmt);
    if cfg.audio_source.is_some() {
        push("-c:a");
        push(&codec.audio_codec);
        push("-b:a");
        push(&codec.audio_bitrate);
    } else {
        push("-an");
    }
    push("-t");
    push(&duration);
    if codec.faststart {
        push("-movflags");
        push("+faststart");
    }
    push("-f");
    push("mp4");
    args.push(opts.out_path.clone().into_os_string());
    args
}

impl FrameSink for FfmpegSink {
    #[tracing::instrument(skip_all, fields(out = %self.opts.out_path.display(), frames = cfg.frame_count))]
    fn begin(&mut self, cfg: SinkConfig) -> ClipframeResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(ClipframeError::encoding("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ClipframeError::encoding(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(ClipframeError::encoding(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if cfg.frame_count == 0 {
            return Err(ClipframeError::encoding(
                "refusing to encode an empty video",
            ));
        }
        self.opts.codec.validate()?;

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(ClipframeError::encoding(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.args(build_ffmpeg_args(&self.opts, &cfg))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            ClipframeError::encoding(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipframeError::encoding("failed to open ffmpeg stdin (unexpected)"))?;
        self.stderr_drain = Some(spawn_drain(child.stderr.take()));
        self.child.put(child);

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.stdin = Some(stdin);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames_written = 0;
        tracing::debug!("ffmpeg encoder started");
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ClipframeResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ClipframeError::encoding("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ClipframeError::encoding(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if self.frames_written >= cfg.frame_count {
            return Err(ClipframeError::encoding(format!(
                "ffmpeg sink received more than the {} announced frames",
                cfg.frame_count
            )));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ClipframeError::encoding(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }

        flatten_premul_over_bg(&mut self.scratch, &frame.data, self.opts.background)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ClipframeError::encoding("ffmpeg sink is already finalized"));
        };
        if let Err(e) = stdin.write_all(&self.scratch) {
            let stderr = self.take_stderr();
            return Err(ClipframeError::encoding(format!(
                "failed to write frame {} to ffmpeg stdin: {e}: {stderr}",
                idx.0
            )));
        }
        self.frames_written += 1;
        Ok(())
    }

    fn end(&mut self) -> ClipframeResult<()> {
        drop(self.stdin.take());
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| ClipframeError::encoding("ffmpeg sink not started"))?;

        let status = self.child.wait(&self.opts.cancel);
        let stderr = self.take_stderr();
        let status = status.map_err(|e| match e.kind() {
            std::io::ErrorKind::Interrupted => ClipframeError::cancelled(e.to_string()),
            _ => ClipframeError::encoding(format!("failed to wait for ffmpeg to finish: {e}")),
        })?;
        if !status.success() {
            return Err(ClipframeError::encoding(format!(
                "ffmpeg exited with status {status}: {stderr}"
            )));
        }
        if self.frames_written != cfg.frame_count {
            return Err(ClipframeError::encoding(format!(
                "ffmpeg received {} of {} frames",
                self.frames_written, cfg.frame_count
            )));
        }
        tracing::debug!(frames = self.frames_written, "ffmpeg encoder finished");
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        self.child.kill();
        let stderr = self.take_stderr();
        if !stderr.is_empty() {
            tracing::debug!(%stderr, "ffmpeg aborted");
        }
        self.cfg = None;
    }

    fn kill_switch(&self) -> Option<KillSwitch> {
        Some(KillSwitch(self.child.clone()))
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        self.child.kill();
    }
}

/// Flatten premultiplied RGBA8 over an opaque background.
///
/// `ffmpeg` has no notion of premultiplied input, so every pixel leaves fully opaque.
pub(crate) fn flatten_premul_over_bg(
    dst: &mut [u8],
    src_premul: &[u8],
    background: Rgba8,
) -> ClipframeResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(ClipframeError::encoding(
            "flatten_premul_over_bg expects equal-length rgba8 buffers",
        ));
    }

    let bg = [background.r as u16, background.g as u16, background.b as u16];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            d[c] = (s[c] as u16 + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ClipframeResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    crate::assets::media::tool_on_path("ffmpeg")
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
