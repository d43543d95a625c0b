use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::ClipframeResult;
use crate::foundation::process::ChildSlot;
use crate::render::backend::FrameRGBA;

/// Configuration provided to a [`FrameSink`] at the start of a job.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Exact number of frames the producer will push.
    pub frame_count: u64,
    /// Optional media input whose first audio stream is passed through.
    pub audio_source: Option<std::ffi::OsString>,
}

impl SinkConfig {
    /// Output duration implied by `frame_count` at `fps`.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.frame_count)
    }
}

/// Handle that lets another thread kill a sink's external process.
#[derive(Clone, Debug)]
pub struct KillSwitch(pub(crate) ChildSlot);

impl KillSwitch {
    /// Kill the process if it is still running.
    pub fn kill(&self) {
        self.0.kill();
    }
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order, exactly
/// `frame_count` times, followed by `end`. When the producer fails, `abort` is called instead of
/// `end` and the sink must not leave a finished-looking output behind.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ClipframeResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ClipframeResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> ClipframeResult<()>;
    /// Release resources after a failed job.
    fn abort(&mut self) {}
    /// Handle for killing the sink's external process from another thread, if it has one.
    fn kill_switch(&self) -> Option<KillSwitch> {
        None
    }
}

/// In-memory sink for tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    keep_frames: bool,
    indices: Vec<FrameIndex>,
    frames: Vec<FrameRGBA>,
    last: Option<FrameRGBA>,
    ended: bool,
    aborted: bool,
}

impl InMemorySink {
    /// Sink that keeps every frame.
    pub fn new() -> Self {
        Self {
            keep_frames: true,
            ..Self::default()
        }
    }

    /// Sink that records indices and only keeps the most recent frame.
    pub fn counting() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Frame indices in the order they were pushed.
    pub fn indices(&self) -> &[FrameIndex] {
        &self.indices
    }

    /// Captured frames (empty for counting sinks).
    pub fn frames(&self) -> &[FrameRGBA] {
        &self.frames
    }

    /// Most recently pushed frame.
    pub fn last_frame(&self) -> Option<&FrameRGBA> {
        self.last.as_ref()
    }

    /// `true` once `end` completed.
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// `true` once `abort` was called.
    pub fn aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ClipframeResult<()> {
        self.cfg = Some(cfg);
        self.indices.clear();
        self.frames.clear();
        self.last = None;
        self.ended = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ClipframeResult<()> {
        self.indices.push(idx);
        if self.keep_frames {
            self.frames.push(frame.clone());
        }
        self.last = Some(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> ClipframeResult<()> {
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
