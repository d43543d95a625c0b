use super::*;

const SAMPLE: &str = r#"{
  "streams": [
    {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720,
     "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001", "duration": "7.366667"},
    {"index": 1, "codec_type": "audio", "codec_name": "aac", "duration": "7.400000"}
  ],
  "format": {"filename": "clip.mp4", "duration": "7.400000", "size": "123456"}
}"#;

#[test]
fn parses_duration_dimensions_and_audio() {
    let p = parse_ffprobe_json(SAMPLE.as_bytes(), Path::new("clip.mp4")).unwrap();
    assert!((p.duration_secs - 7.4).abs() < 1e-9);
    assert_eq!((p.width, p.height), (1280, 720));
    assert!(p.has_audio);
    assert_eq!(p.video_codec.as_deref(), Some("h264"));
    assert!((p.fps.unwrap() - 29.97).abs() < 0.01);
}

#[test]
fn falls_back_to_stream_duration() {
    let json = r#"{"streams":[{"codec_type":"video","width":2,"height":2,"duration":"3.5"}],
                   "format":{}}"#;
    let p = parse_ffprobe_json(json.as_bytes(), Path::new("x")).unwrap();
    assert!((p.duration_secs - 3.5).abs() < 1e-9);
    assert!(!p.has_audio);
}

#[test]
fn missing_or_bad_duration_is_a_probe_error() {
    for json in [
        r#"{"streams":[{"codec_type":"video","width":2,"height":2}],"format":{}}"#,
        r#"{"streams":[{"codec_type":"video","width":2,"height":2}],"format":{"duration":"N/A"}}"#,
        r#"{"streams":[{"codec_type":"video","width":2,"height":2}],"format":{"duration":"0"}}"#,
        r#"{"streams":[{"codec_type":"video","width":2,"height":2}],"format":{"duration":"-1"}}"#,
        r#"{"streams":[{"codec_type":"video","width":2,"height":2}],"format":{"duration":"inf"}}"#,
    ] {
        let err = parse_ffprobe_json(json.as_bytes(), Path::new("x")).unwrap_err();
        assert!(matches!(err, ClipframeError::Probe(_)), "{json}: {err}");
    }
}

#[test]
fn audio_only_or_garbage_is_rejected() {
    let audio_only = r#"{"streams":[{"codec_type":"audio"}],"format":{"duration":"2"}}"#;
    assert!(parse_ffprobe_json(audio_only.as_bytes(), Path::new("x")).is_err());
    assert!(parse_ffprobe_json(b"not json", Path::new("x")).is_err());
}

#[test]
fn frame_rate_parsing() {
    assert_eq!(parse_frame_rate("30/1"), Some(30.0));
    assert_eq!(parse_frame_rate("25"), Some(25.0));
    assert_eq!(parse_frame_rate("0/0"), None);
    assert_eq!(parse_frame_rate("abc"), None);
}

#[test]
fn probing_a_missing_file_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let err = probe_media(&dir.path().join("nope.mp4"), Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, ClipframeError::Probe(_)));
}

#[test]
fn probing_a_non_media_file_is_a_probe_error() {
    if !is_ffprobe_on_path() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.mp4");
    std::fs::write(&path, b"this is not an mp4").unwrap();
    let err = probe_media(&path, Duration::from_secs(10)).unwrap_err();
    assert!(matches!(err, ClipframeError::Probe(_)));
}

#[cfg(unix)]
#[test]
fn hung_prober_is_killed_and_reported_as_probe_error() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mp4");
    std::fs::write(&clip, b"whatever").unwrap();
    let mut hung = Command::new("sh");
    hung.args(["-c", "exec sleep 5", "sh"]);

    let started = std::time::Instant::now();
    let err = probe_with(hung, &clip, Duration::from_millis(100)).unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(err, ClipframeError::Probe(_)), "{err}");
    assert!(err.to_string().contains("timed out"), "{err}");
}
