use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assets::video_stream::{VideoFrame, VideoFrameStream};
use crate::composition::geometry::CanvasGeometry;
use crate::composition::layers::{LayerList, build_layers};
use crate::config::PipelineConfig;
use crate::encode::ffmpeg::{CodecParams, FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Fps, FrameIndex, FrameRange};
use crate::foundation::error::{ClipframeError, ClipframeResult};
use crate::pipeline::job::{JobId, JobInputs, RenderJob};
use crate::render::backend::FrameRGBA;
use crate::render::cpu::{CpuPaints, CpuRasterizer};
use crate::render::prepare::PreparedComposition;

const SEND_POLL: Duration = Duration::from_millis(5);
/// Upper bound on frame bytes held by one rasterized chunk.
const MAX_CHUNK_BYTES: usize = 256 * 1024 * 1024;

/// Frame counts of a finished render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Frames on the timeline.
    pub frames_total: u64,
    /// Frames rasterized and accepted by the sink.
    pub frames_rendered: u64,
    /// Frames actually decoded from the source clip (the rest hold its last frame).
    pub video_frames_decoded: u64,
}

/// Finished MP4 at its final path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncodedArtifact {
    /// Job that produced it.
    pub job_id: JobId,
    /// Final file path.
    pub path: PathBuf,
    /// Frame count.
    pub duration_in_frames: u64,
    /// Frame rate.
    pub fps: Fps,
    /// `duration_in_frames / fps`.
    pub duration_secs: f64,
    /// Encoder settings used.
    pub codec: CodecParams,
    /// File size in bytes.
    pub byte_size: u64,
    /// Render counters.
    pub stats: RenderStats,
}

enum SinkMsg {
    Frame(FrameIndex, FrameRGBA),
    Finish,
}

/// Removes the partial output on drop unless committed.
struct PartialOutput {
    path: Option<PathBuf>,
}

impl PartialOutput {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Atomically move the partial file to `dst`.
    fn commit(mut self, dst: &Path) -> ClipframeResult<()> {
        let Some(src) = self.path.as_ref() else {
            return Err(ClipframeError::delivery("partial output already consumed"));
        };
        std::fs::rename(src, dst).map_err(|e| {
            ClipframeError::delivery(format!(
                "failed to move '{}' to '{}': {e}",
                src.display(),
                dst.display()
            ))
        })?;
        self.path = None;
        Ok(())
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Runs jobs end to end: probe, compose, rasterize, encode.
///
/// Holds no per-job state; one instance can serve concurrent jobs from several threads.
#[derive(Clone, Debug)]
pub struct Pipeline {
    cfg: PipelineConfig,
    geometry: CanvasGeometry,
}

impl Pipeline {
    /// Pipeline with the template geometry.
    pub fn new(cfg: PipelineConfig) -> ClipframeResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            geometry: CanvasGeometry::template(),
        })
    }

    /// Replace the output geometry.
    pub fn with_geometry(mut self, geometry: CanvasGeometry) -> ClipframeResult<Self> {
        geometry.validate()?;
        self.geometry = geometry;
        Ok(self)
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Active geometry.
    pub fn geometry(&self) -> &CanvasGeometry {
        &self.geometry
    }

    /// Build a job (probing the clip) without rendering it.
    pub fn build_job(&self, inputs: JobInputs) -> ClipframeResult<RenderJob> {
        RenderJob::build(inputs, self.geometry, &self.cfg)
    }

    /// Layer list for `job`.
    pub fn layers_for(&self, job: &RenderJob) -> LayerList {
        build_layers(
            job.geometry(),
            &self.cfg.template_path,
            job.clip().locator.as_ref(),
            job.label(),
        )
    }

    /// Token carrying the configured render deadline.
    pub fn cancel_token(&self) -> CancelToken {
        match self.cfg.render_timeout() {
            Some(t) => CancelToken::with_timeout(t),
            None => CancelToken::new(),
        }
    }

    /// Build and render in one call.
    pub fn run(&self, inputs: JobInputs, cancel: &CancelToken) -> ClipframeResult<EncodedArtifact> {
        let job = self.build_job(inputs)?;
        self.render(&job, cancel)
    }

    /// Render `job` to its output path.
    ///
    /// The encoder writes a hidden partial file next to the final path; it is renamed only after
    /// `ffmpeg` exits cleanly and removed on any failure.
    #[tracing::instrument(skip_all, fields(job = %job.id()))]
    pub fn render(
        &self,
        job: &RenderJob,
        cancel: &CancelToken,
    ) -> ClipframeResult<EncodedArtifact> {
        let started = Instant::now();
        let out_dir = job
            .output_path()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        // create_dir_all tolerates concurrent creators.
        std::fs::create_dir_all(out_dir).map_err(|e| {
            ClipframeError::preparation(format!(
                "failed to create output directory '{}': {e}",
                out_dir.display()
            ))
        })?;

        let partial = PartialOutput::new(job.partial_path());
        let mut opts = FfmpegSinkOpts::new(job.partial_path());
        opts.background = job.geometry().background;
        opts.codec = job.codec().clone();
        opts.cancel = cancel.clone();
        let mut sink = FfmpegSink::new(opts);

        let stats = self.render_into(job, &mut sink, cancel)?;
        drop(sink);

        partial.commit(job.output_path())?;
        let byte_size = std::fs::metadata(job.output_path())
            .map(|m| m.len())
            .map_err(|e| {
                ClipframeError::delivery(format!(
                    "artifact '{}' is not readable: {e}",
                    job.output_path().display()
                ))
            })?;

        tracing::info!(
            frames = stats.frames_rendered,
            decoded = stats.video_frames_decoded,
            bytes = byte_size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "render finished"
        );
        Ok(EncodedArtifact {
            job_id: job.id().clone(),
            path: job.output_path().to_path_buf(),
            duration_in_frames: job.duration_in_frames(),
            fps: job.fps(),
            duration_secs: job.fps().frames_to_secs(job.duration_in_frames()),
            codec: job.codec().clone(),
            byte_size,
            stats,
        })
    }

    /// Rasterize every frame of `job` into `sink`.
    ///
    /// The sink runs on its own thread behind a bounded channel. On any failure the sink is
    /// aborted (never finished) and external processes are killed.
    pub fn render_into(
        &self,
        job: &RenderJob,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> ClipframeResult<RenderStats> {
        let layers = self.layers_for(job);
        let prepared = PreparedComposition::prepare(&layers, &self.cfg.font_path)?;
        let paints = CpuPaints::new(&prepared)?;
        cancel.check()?;

        let range = FrameRange::new(FrameIndex(0), FrameIndex(job.duration_in_frames()))?;
        if range.is_empty() {
            return Err(ClipframeError::preparation("job has no frames to render"));
        }
        let pool = if self.cfg.parallel {
            Some(build_thread_pool(self.cfg.threads)?)
        } else {
            None
        };

        let audio_source = job
            .clip()
            .locator
            .as_ref()
            .filter(|_| job.clip().may_have_audio())
            .map(|l| l.as_ffmpeg_input());
        let sink_cfg = SinkConfig {
            width: prepared.canvas().width,
            height: prepared.canvas().height,
            fps: job.fps(),
            frame_count: range.len_frames(),
            audio_source,
        };
        let kill = sink.kill_switch();
        let capacity = self.cfg.channel_capacity.max(1);
        let chunk = normalized_chunk_size(self.cfg.chunk_size, &prepared);

        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::sync_channel::<SinkMsg>(capacity);
            let encoder = scope.spawn(move || -> ClipframeResult<()> {
                sink.begin(sink_cfg)?;
                loop {
                    match rx.recv() {
                        Ok(SinkMsg::Frame(idx, frame)) => {
                            if let Err(e) = sink.push_frame(idx, &frame) {
                                sink.abort();
                                return Err(e);
                            }
                        }
                        Ok(SinkMsg::Finish) => return sink.end(),
                        Err(_) => {
                            sink.abort();
                            return Err(ClipframeError::encoding(
                                "frame producer stopped before the last frame",
                            ));
                        }
                    }
                }
            });

            let produced = produce_frames(
                &prepared,
                &paints,
                job,
                range,
                chunk,
                capacity,
                pool.as_ref(),
                &tx,
                cancel,
            );
            let produced = produced.and_then(|stats| {
                send_msg(&tx, SinkMsg::Finish, cancel)?;
                Ok(stats)
            });
            drop(tx);
            if produced.is_err()
                && let Some(k) = kill.as_ref()
            {
                k.kill();
            }

            let encoded = encoder
                .join()
                .map_err(|_| ClipframeError::encoding("encoder thread panicked"))
                .and_then(|r| r);

            match (produced, encoded) {
                (Ok(stats), Ok(())) => Ok(stats),
                // The encoder's own error explains a refused send better.
                (Err(ClipframeError::Encoding(_)), Err(enc)) => Err(enc),
                (Err(e), _) => Err(e),
                (Ok(_), Err(e)) => Err(e),
            }
        })
    }

    /// Render a single composition frame, e.g. for previews.
    #[tracing::instrument(skip_all, fields(job = %job.id(), frame = frame.0))]
    pub fn render_frame(
        &self,
        job: &RenderJob,
        frame: FrameIndex,
        cancel: &CancelToken,
    ) -> ClipframeResult<FrameRGBA> {
        if frame.0 >= job.duration_in_frames() {
            return Err(ClipframeError::validation(format!(
                "frame {} is outside the {}-frame timeline",
                frame.0,
                job.duration_in_frames()
            )));
        }
        let layers = self.layers_for(job);
        let prepared = PreparedComposition::prepare(&layers, &self.cfg.font_path)?;
        let paints = CpuPaints::new(&prepared)?;

        let video = match prepared.video() {
            Some(v) => {
                let mut start = job.fps().frames_to_secs(frame.0);
                // Past the end of the clip the timeline holds its last frame.
                if let Some(p) = job.clip().probe.as_ref() {
                    let last = (p.duration_secs - job.fps().frame_duration_secs()).max(0.0);
                    start = start.min(last);
                }
                let mut stream = VideoFrameStream::spawn(
                    &v.source,
                    job.fps(),
                    v.frame_width,
                    v.frame_height,
                    start,
                    1,
                )?;
                match stream.next_decoded(cancel)? {
                    Some(frame) => Some(frame),
                    // Unprobed clip shorter than the timeline: the seek ran off its end.
                    None if start > 0.0 => {
                        tracing::debug!(start, "seek past end of clip, using its last frame");
                        let mut tail = VideoFrameStream::spawn_tail(
                            &v.source,
                            job.fps(),
                            v.frame_width,
                            v.frame_height,
                        )?;
                        Some(tail.last_frame(cancel)?)
                    }
                    None => Some(stream.next_frame(cancel)?),
                }
            }
            None => None,
        };
        let (w, h) = prepared.canvas_u16();
        CpuRasterizer::new(w, h).rasterize(&prepared, &paints, video.as_ref())
    }
}

#[allow(clippy::too_many_arguments)]
fn produce_frames(
    prepared: &PreparedComposition,
    paints: &CpuPaints,
    job: &RenderJob,
    range: FrameRange,
    chunk: u64,
    capacity: usize,
    pool: Option<&rayon::ThreadPool>,
    tx: &SyncSender<SinkMsg>,
    cancel: &CancelToken,
) -> ClipframeResult<RenderStats> {
    let mut decoder = match prepared.video() {
        Some(v) => Some(VideoFrameStream::spawn(
            &v.source,
            job.fps(),
            v.frame_width,
            v.frame_height,
            0.0,
            capacity,
        )?),
        None => None,
    };
    let (w, h) = prepared.canvas_u16();
    let mut serial = pool.is_none().then(|| CpuRasterizer::new(w, h));
    let mut stats = RenderStats {
        frames_total: range.len_frames(),
        ..RenderStats::default()
    };

    for sub in range.chunks(chunk) {
        cancel.check()?;
        let mut videos: Vec<Option<VideoFrame>> = Vec::with_capacity(sub.len_frames() as usize);
        for _ in sub.start.0..sub.end.0 {
            videos.push(match decoder.as_mut() {
                Some(d) => Some(d.next_frame(cancel)?),
                None => None,
            });
        }

        let rendered: Vec<ClipframeResult<FrameRGBA>> = match (pool, serial.as_mut()) {
            (Some(pool), _) => pool.install(|| {
                videos
                    .par_iter()
                    .map_init(
                        || CpuRasterizer::new(w, h),
                        |r, v| r.rasterize(prepared, paints, v.as_ref()),
                    )
                    .collect()
            }),
            (None, Some(r)) => videos
                .iter()
                .map(|v| r.rasterize(prepared, paints, v.as_ref()))
                .collect(),
            (None, None) => {
                return Err(ClipframeError::rasterization("no rasterizer available"));
            }
        };

        for (offset, frame) in rendered.into_iter().enumerate() {
            let idx = FrameIndex(sub.start.0 + offset as u64);
            send_msg(tx, SinkMsg::Frame(idx, frame?), cancel)?;
            stats.frames_rendered += 1;
        }
        tracing::debug!(start = sub.start.0, end = sub.end.0, "chunk rendered");
    }

    stats.video_frames_decoded = decoder.as_ref().map_or(0, |d| d.decoded_frames());
    Ok(stats)
}

/// Send with backpressure, polling `cancel` while the channel is full.
fn send_msg(
    tx: &SyncSender<SinkMsg>,
    mut msg: SinkMsg,
    cancel: &CancelToken,
) -> ClipframeResult<()> {
    loop {
        match tx.try_send(msg) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(back)) => {
                cancel.check()?;
                msg = back;
                std::thread::sleep(SEND_POLL);
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(ClipframeError::encoding("encoder stopped accepting frames"));
            }
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> ClipframeResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ClipframeError::config(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        ClipframeError::rasterization(format!("failed to build rayon thread pool: {e}"))
    })
}

fn normalized_chunk_size(chunk_size: usize, prepared: &PreparedComposition) -> u64 {
    let c = prepared.canvas();
    let frame_bytes = (c.width as usize) * (c.height as usize) * 4;
    let cap = (MAX_CHUNK_BYTES / frame_bytes.max(1)).max(1);
    chunk_size.clamp(1, cap) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
