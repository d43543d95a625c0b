use super::*;

fn cfg(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        output_dir: dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

fn inputs(video: Option<&str>) -> JobInputs {
    JobInputs {
        video: video.and_then(SourceLocator::parse),
        probe_path: None,
        label: OverlayLabel::parse("dr. asha rao").unwrap(),
    }
}

#[test]
fn probed_duration_is_floored() {
    let fps = Fps::default();
    assert_eq!(resolve_duration(Some(7.4), fps, 10.0), (222, DurationSource::Probed));
    assert_eq!(resolve_duration(Some(7.399), fps, 10.0), (221, DurationSource::Probed));
}

#[test]
fn fallback_only_without_probe() {
    let fps = Fps::default();
    assert_eq!(resolve_duration(None, fps, 10.0), (300, DurationSource::Fallback));
    assert_eq!(resolve_duration(Some(f64::NAN), fps, 10.0), (300, DurationSource::Fallback));
}

#[test]
fn tiny_probed_clip_keeps_one_frame() {
    let (frames, source) = resolve_duration(Some(0.01), Fps::default(), 10.0);
    assert_eq!(frames, 1);
    assert_eq!(source, DurationSource::Probed);
}

#[test]
fn job_id_shape_and_file_names() {
    let id = JobId::generate();
    let (millis, rand) = id.as_str().split_once('-').unwrap();
    assert!(millis.parse::<u128>().is_ok());
    assert_eq!(rand.len(), 8);
    assert!(rand.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(id.output_file_name(), format!("video-{id}.mp4"));
    assert!(id.partial_file_name().starts_with(".video-"));
    assert_ne!(JobId::generate(), JobId::generate());
}

#[test]
fn no_clip_uses_fallback_duration() {
    let dir = tempfile::tempdir().unwrap();
    let job = RenderJob::build(inputs(None), CanvasGeometry::template(), &cfg(dir.path())).unwrap();
    assert_eq!(job.duration_in_frames(), 300);
    assert_eq!(job.duration_source(), DurationSource::Fallback);
    assert!(job.clip().locator.is_none());
    assert!(job.clip().may_have_audio());
}

#[test]
fn unreadable_clip_falls_back_without_failing() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.mp4");
    let job = RenderJob::build(
        inputs(missing.to_str()),
        CanvasGeometry::template(),
        &cfg(dir.path()),
    )
    .unwrap();
    assert_eq!(job.duration_in_frames(), 300);
    assert_eq!(job.duration_source(), DurationSource::Fallback);
    assert!(job.clip().probe.is_none());
}

#[test]
fn url_clip_is_not_probed_unless_a_local_copy_is_given() {
    let dir = tempfile::tempdir().unwrap();
    let mut i = inputs(Some("https://cdn.example.com/clip.mp4"));
    assert_eq!(
        SourceClip {
            locator: i.video.clone(),
            probe_path: None,
            probe: None
        }
        .probe_target(),
        None
    );
    i.probe_path = Some(dir.path().join("local.mp4"));
    let job = RenderJob::build(i, CanvasGeometry::template(), &cfg(dir.path())).unwrap();
    assert_eq!(job.clip().probe_target(), Some(dir.path().join("local.mp4").as_path()));
    assert_eq!(job.duration_source(), DurationSource::Fallback);
}

#[test]
fn output_and_partial_paths_share_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let job = RenderJob::build(inputs(None), CanvasGeometry::template(), &cfg(dir.path())).unwrap();
    assert_eq!(job.output_path().parent(), Some(dir.path()));
    assert_eq!(job.partial_path().parent(), Some(dir.path()));
    assert_ne!(job.output_path(), job.partial_path());
    assert_eq!(job.codec().crf, 23);
    assert_eq!(job.fps(), Fps::default());
}

#[test]
fn invalid_config_fails_the_build() {
    let dir = tempfile::tempdir().unwrap();
    let bad = PipelineConfig {
        fps: 0,
        ..cfg(dir.path())
    };
    assert!(RenderJob::build(inputs(None), CanvasGeometry::template(), &bad).is_err());
}
