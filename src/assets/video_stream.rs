use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::assets::locator::SourceLocator;
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::Fps;
use crate::foundation::error::{ClipframeError, ClipframeResult};
use crate::foundation::process::{ChildSlot, join_drain, spawn_drain};

const RECV_POLL: Duration = Duration::from_millis(50);

/// How far before the end [`VideoFrameStream::spawn_tail`] starts decoding.
pub(crate) const TAIL_SECS: f64 = 1.0;

/// One decoded video frame, already cover-scaled to the target size.
///
/// Decoded frames are opaque, so the bytes are valid as both straight and premultiplied RGBA8.
#[derive(Clone, Debug)]
pub(crate) struct VideoFrame {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba8_premul: Arc<Vec<u8>>,
}

/// Sequential frame reader over an `ffmpeg` decode process.
///
/// `ffmpeg` resamples the source to the composition rate and cover-scales it to `width x height`,
/// so frame `i` of the stream is composition frame `i`. Once the source runs out, the last decoded
/// frame is held for the rest of the timeline.
pub(crate) struct VideoFrameStream {
    width: u32,
    height: u32,
    rx: Receiver<Vec<u8>>,
    reader: Option<JoinHandle<std::io::Result<()>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    child: ChildSlot,
    last: Option<VideoFrame>,
    decoded: u64,
    exhausted: bool,
}

impl VideoFrameStream {
    /// Start decoding `source` from `start_secs`.
    #[tracing::instrument(skip_all, fields(source = %source, width = width, height = height))]
    pub(crate) fn spawn(
        source: &SourceLocator,
        fps: Fps,
        width: u32,
        height: u32,
        start_secs: f64,
        capacity: usize,
    ) -> ClipframeResult<Self> {
        let seek = if start_secs > 0.0 {
            vec!["-ss".to_string(), format!("{start_secs:.6}")]
        } else {
            Vec::new()
        };
        Self::spawn_with_seek(source, fps, width, height, &seek, capacity)
    }

    /// Decode only the last [`TAIL_SECS`] of `source`, for when its length is unknown.
    #[tracing::instrument(skip_all, fields(source = %source, width = width, height = height))]
    pub(crate) fn spawn_tail(
        source: &SourceLocator,
        fps: Fps,
        width: u32,
        height: u32,
    ) -> ClipframeResult<Self> {
        let seek = ["-sseof".to_string(), format!("-{TAIL_SECS:.3}")];
        Self::spawn_with_seek(source, fps, width, height, &seek, 1)
    }

    fn spawn_with_seek(
        source: &SourceLocator,
        fps: Fps,
        width: u32,
        height: u32,
        seek: &[String],
        capacity: usize,
    ) -> ClipframeResult<Self> {
        if width == 0 || height == 0 {
            return Err(ClipframeError::rasterization(
                "video frame size must be non-zero",
            ));
        }
        let filter = format!(
            "fps={rate},scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height},setsar=1",
            rate = fps.ffmpeg_rate()
        );

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-nostdin", "-v", "error"]).args(seek);
        cmd.arg("-i")
            .arg(source.as_ffmpeg_input())
            .args(["-an", "-sn", "-vf", &filter])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            ClipframeError::rasterization(format!(
                "failed to spawn ffmpeg video decoder (is it installed and on PATH?): {e}"
            ))
        })?;
        let mut stdout = child.stdout.take().ok_or_else(|| {
            ClipframeError::rasterization("failed to open ffmpeg stdout (unexpected)")
        })?;
        let stderr_drain = spawn_drain(child.stderr.take());

        let frame_len = (width as usize) * (height as usize) * 4;
        let (tx, rx) = mpsc::sync_channel::<Vec<u8>>(capacity.max(1));
        let reader = std::thread::spawn(move || -> std::io::Result<()> {
            loop {
                let mut buf = vec![0u8; frame_len];
                match stdout.read_exact(&mut buf) {
                    Ok(()) => {
                        if tx.send(buf).is_err() {
                            return Ok(());
                        }
                    }
                    // A trailing partial frame is dropped.
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
        });

        let slot = ChildSlot::default();
        slot.put(child);
        Ok(Self {
            width,
            height,
            rx,
            reader: Some(reader),
            stderr_drain: Some(stderr_drain),
            child: slot,
            last: None,
            decoded: 0,
            exhausted: false,
        })
    }

    /// Number of frames actually decoded from the source so far.
    pub(crate) fn decoded_frames(&self) -> u64 {
        self.decoded
    }

    /// Next composition frame. Holds the last decoded frame once the source is exhausted.
    pub(crate) fn next_frame(&mut self, cancel: &CancelToken) -> ClipframeResult<VideoFrame> {
        match self.next_decoded(cancel)? {
            Some(frame) => Ok(frame),
            None => self.held_frame(),
        }
    }

    /// Next frame actually decoded from the source, or `None` once the source is exhausted.
    pub(crate) fn next_decoded(
        &mut self,
        cancel: &CancelToken,
    ) -> ClipframeResult<Option<VideoFrame>> {
        while !self.exhausted {
            cancel.check()?;
            match self.rx.recv_timeout(RECV_POLL) {
                Ok(buf) => {
                    let frame = VideoFrame {
                        width: self.width,
                        height: self.height,
                        rgba8_premul: Arc::new(buf),
                    };
                    self.decoded += 1;
                    self.last = Some(frame.clone());
                    return Ok(Some(frame));
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => self.finish(cancel)?,
            }
        }
        Ok(None)
    }

    /// Read the source to its end and return the final frame.
    pub(crate) fn last_frame(&mut self, cancel: &CancelToken) -> ClipframeResult<VideoFrame> {
        while self.next_decoded(cancel)?.is_some() {}
        self.held_frame()
    }

    fn held_frame(&self) -> ClipframeResult<VideoFrame> {
        self.last
            .clone()
            .ok_or_else(|| ClipframeError::rasterization("video decoder produced no frames"))
    }

    fn finish(&mut self, cancel: &CancelToken) -> ClipframeResult<()> {
        self.exhausted = true;
        let read_result = match self.reader.take() {
            Some(h) => h
                .join()
                .map_err(|_| ClipframeError::rasterization("video reader thread panicked"))?,
            None => Ok(()),
        };
        let status = self.child.wait(cancel);
        let stderr = match self.stderr_drain.take().map(join_drain) {
            Some(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
            _ => String::new(),
        };
        cancel.check()?;

        let failure = match (&read_result, &status) {
            (Err(e), _) => Some(format!("failed to read decoded frames: {e}")),
            (_, Err(e)) => Some(format!("failed to wait for ffmpeg decoder: {e}")),
            (_, Ok(s)) if !s.success() => Some(format!("ffmpeg decoder exited with {s}: {stderr}")),
            _ => None,
        };
        match failure {
            Some(msg) if self.decoded == 0 => Err(ClipframeError::rasterization(msg)),
            Some(msg) => {
                tracing::warn!(decoded = self.decoded, "{msg}; holding last decoded frame");
                Ok(())
            }
            None => {
                tracing::debug!(decoded = self.decoded, "video source exhausted");
                Ok(())
            }
        }
    }
}

impl Drop for VideoFrameStream {
    fn drop(&mut self) {
        self.child.kill();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/video_stream.rs"]
mod tests;
