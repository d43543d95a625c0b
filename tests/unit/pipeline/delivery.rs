use super::*;
use crate::encode::ffmpeg::CodecParams;
use crate::foundation::core::Fps;
use crate::pipeline::job::JobId;
use crate::pipeline::orchestrator::RenderStats;

fn artifact(path: PathBuf) -> EncodedArtifact {
    EncodedArtifact {
        job_id: JobId::generate(),
        path,
        duration_in_frames: 30,
        fps: Fps::default(),
        duration_secs: 1.0,
        codec: CodecParams::default(),
        byte_size: 0,
        stats: RenderStats::default(),
    }
}

#[test]
fn url_joins_prefix_and_name() {
    assert_eq!(public_url("/generated", "video-1.mp4"), "/generated/video-1.mp4");
    assert_eq!(public_url("/generated/", "video-1.mp4"), "/generated/video-1.mp4");
    assert_eq!(public_url("", "video-1.mp4"), "/video-1.mp4");
}

#[test]
fn delivers_existing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("video-1.mp4");
    std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42").unwrap();
    let d = deliver(&artifact(path.clone()), "/generated").unwrap();
    assert_eq!(d.url, "/generated/video-1.mp4");
    assert_eq!(d.path, path);
    assert_eq!(d.byte_size, 12);
    assert_eq!(read_artifact_bytes(&path).unwrap().len(), 12);
}

#[test]
fn missing_or_empty_artifact_is_a_delivery_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.mp4");
    assert!(matches!(
        deliver(&artifact(missing), "/generated"),
        Err(ClipframeError::Delivery(_))
    ));

    let empty = dir.path().join("empty.mp4");
    std::fs::write(&empty, b"").unwrap();
    assert!(matches!(
        deliver(&artifact(empty.clone()), "/generated"),
        Err(ClipframeError::Delivery(_))
    ));
    assert!(read_artifact_bytes(&empty).is_err());
}

#[test]
fn directory_is_not_an_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let err = deliver(&artifact(dir.path().to_path_buf()), "/generated").unwrap_err();
    assert!(err.to_string().contains("not a regular file"), "{err}");
}
