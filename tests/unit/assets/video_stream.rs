use super::*;
use crate::assets::media::tool_on_path;

fn synth_clip(dir: &std::path::Path, secs: f64, size: &str) -> Option<std::path::PathBuf> {
    if !tool_on_path("ffmpeg") {
        return None;
    }
    let out = dir.join("clip.mp4");
    let status = Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={size}:rate=10:duration={secs}"))
        .args(["-pix_fmt", "yuv420p"])
        .arg(&out)
        .status()
        .ok()?;
    status.success().then_some(out)
}

#[test]
fn holds_last_frame_after_source_ends() {
    let dir = tempfile::tempdir().unwrap();
    let Some(clip) = synth_clip(dir.path(), 0.5, "64x32") else {
        return;
    };
    let fps = Fps::new(10, 1).unwrap();
    let mut stream =
        VideoFrameStream::spawn(&SourceLocator::Path(clip), fps, 16, 16, 0.0, 2).unwrap();
    let cancel = CancelToken::new();

    let mut last = None;
    for _ in 0..8 {
        let f = stream.next_frame(&cancel).unwrap();
        assert_eq!((f.width, f.height), (16, 16));
        assert_eq!(f.rgba8_premul.len(), 16 * 16 * 4);
        last = Some(f);
    }
    assert_eq!(stream.decoded_frames(), 5);
    let held = stream.next_frame(&cancel).unwrap();
    assert_eq!(held.rgba8_premul, last.unwrap().rgba8_premul);
}

#[test]
fn seek_past_end_yields_nothing_but_tail_has_the_last_frame() {
    let dir = tempfile::tempdir().unwrap();
    let Some(clip) = synth_clip(dir.path(), 0.5, "64x32") else {
        return;
    };
    let fps = Fps::new(10, 1).unwrap();
    let source = SourceLocator::Path(clip);
    let cancel = CancelToken::new();

    let mut full = VideoFrameStream::spawn(&source, fps, 16, 16, 0.0, 2).unwrap();
    let last = full.last_frame(&cancel).unwrap();
    assert_eq!(full.decoded_frames(), 5);

    let mut past = VideoFrameStream::spawn(&source, fps, 16, 16, 3.0, 1).unwrap();
    assert!(past.next_decoded(&cancel).unwrap().is_none());
    assert!(matches!(
        past.next_frame(&cancel),
        Err(ClipframeError::Rasterization(_))
    ));

    let mut tail = VideoFrameStream::spawn_tail(&source, fps, 16, 16).unwrap();
    let held = tail.last_frame(&cancel).unwrap();
    assert!(tail.decoded_frames() >= 1);
    assert_eq!(held.rgba8_premul, last.rgba8_premul);
}

#[test]
fn unreadable_source_errors_without_frames() {
    if !tool_on_path("ffmpeg") {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.mp4");
    std::fs::write(&bogus, b"not a video").unwrap();
    let mut stream = VideoFrameStream::spawn(
        &SourceLocator::Path(bogus),
        Fps::default(),
        8,
        8,
        0.0,
        2,
    )
    .unwrap();
    let err = stream.next_frame(&CancelToken::new()).unwrap_err();
    assert!(matches!(err, ClipframeError::Rasterization(_)));
}

#[test]
fn cancelled_token_stops_reading() {
    let dir = tempfile::tempdir().unwrap();
    let Some(clip) = synth_clip(dir.path(), 1.0, "32x32") else {
        return;
    };
    let mut stream = VideoFrameStream::spawn(
        &SourceLocator::Path(clip),
        Fps::default(),
        8,
        8,
        0.0,
        2,
    )
    .unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        stream.next_frame(&cancel),
        Err(ClipframeError::Cancelled(_))
    ));
}

#[test]
fn zero_size_is_rejected() {
    let res = VideoFrameStream::spawn(
        &SourceLocator::Path("x.mp4".into()),
        Fps::default(),
        0,
        8,
        0.0,
        1,
    );
    assert!(res.is_err());
}
