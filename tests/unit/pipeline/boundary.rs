use super::*;
use crate::config::PipelineConfig;

fn req(video: &str, label: &str) -> GenerateRequest {
    GenerateRequest {
        video: video.to_string(),
        label: label.to_string(),
        ..GenerateRequest::default()
    }
}

fn pipeline(dir: &std::path::Path) -> Pipeline {
    Pipeline::new(PipelineConfig {
        output_dir: dir.join("generated"),
        font_path: dir.join("missing-font.ttf"),
        default_duration_secs: 0.1,
        ..PipelineConfig::default()
    })
    .unwrap()
}

#[test]
fn missing_fields_are_bad_input() {
    for r in [req("", "Dr. Asha Rao"), req("clip.mp4", "   ")] {
        let err = r.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadInput);
        assert_eq!(err.user_message(), "Missing video or label");
    }
}

#[test]
fn content_type_must_be_mp4() {
    let mut r = req("upload.bin", "Dr. Asha Rao");
    r.content_type = Some("video/quicktime".to_string());
    assert!(matches!(r.validate(), Err(ClipframeError::Validation(_))));

    r.content_type = Some("Video/MP4; codecs=\"avc1\"".to_string());
    assert!(r.validate().is_ok());
}

#[test]
fn extension_is_checked_without_a_content_type() {
    assert!(req("clip.mov", "Dr. Asha Rao").validate().is_err());
    assert!(req("CLIP.MP4", "Dr. Asha Rao").validate().is_ok());
    assert!(
        req("https://cdn.example.com/clip.mp4?sig=abc", "Dr. Asha Rao")
            .validate()
            .is_ok()
    );
}

#[test]
fn overlong_label_is_rejected_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let long = "a".repeat(51);
    let resp = handle_generate(&pipeline(dir.path()), &req("clip.mp4", &long), &CancelToken::new());
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::BadInput));
    assert_eq!(resp.http_status(), 400);
    // Nothing ran, so the output directory was never created.
    assert!(!dir.path().join("generated").exists());
}

#[test]
fn preview_only_echoes_source_and_display_label() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = req("https://cdn.example.com/clip.mp4", "dr. asha rao");
    r.mode = DeliveryMode::PreviewOnly;
    let resp = handle_generate(&pipeline(dir.path()), &r, &CancelToken::new());
    assert!(resp.success);
    assert_eq!(resp.video_url.as_deref(), Some("https://cdn.example.com/clip.mp4"));
    assert_eq!(resp.label.as_deref(), Some("Dr. Asha Rao"));
    assert_eq!(resp.duration_in_frames, None);
    assert_eq!(resp.http_status(), 200);
}

#[test]
fn render_failure_is_reported_without_stage_detail() {
    let dir = tempfile::tempdir().unwrap();
    let resp = handle_generate(
        &pipeline(dir.path()),
        &req("missing.mp4", "Dr. Asha Rao"),
        &CancelToken::new(),
    );
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::RenderFailed));
    assert_eq!(resp.message, "Rendering failed, please try again");
    assert_eq!(resp.http_status(), 500);
}

#[test]
fn server_misconfiguration_is_not_blamed_on_the_caller() {
    let err = Pipeline::new(PipelineConfig {
        fps: 0,
        ..PipelineConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, ClipframeError::Config(_)));

    let resp = GenerateResponse::failure(&err);
    assert_eq!(resp.error_kind, Some(ErrorKind::RenderFailed));
    assert_eq!(resp.http_status(), 500);
    assert_eq!(resp.message, "Rendering failed, please try again");
    assert!(!resp.message.contains("Fps"));

    let mut geometry = crate::composition::geometry::CanvasGeometry::template();
    geometry.canvas.width = 0;
    let err = pipeline(std::path::Path::new("."))
        .with_geometry(geometry)
        .unwrap_err();
    assert_eq!(GenerateResponse::failure(&err).http_status(), 500);
}

#[test]
fn request_and_response_use_camel_case_json() {
    let r: GenerateRequest = serde_json::from_str(
        r#"{"video":"clip.mp4","contentType":"video/mp4","localPath":"/tmp/x.mp4","label":"x","mode":"preview_only"}"#,
    )
    .unwrap();
    assert_eq!(r.content_type.as_deref(), Some("video/mp4"));
    assert_eq!(r.mode, DeliveryMode::PreviewOnly);

    let defaulted: GenerateRequest =
        serde_json::from_str(r#"{"video":"a.mp4","label":"x"}"#).unwrap();
    assert_eq!(defaulted.mode, DeliveryMode::Render);

    let resp = GenerateResponse::failure(&ClipframeError::delivery("disk gone"));
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["errorKind"], "delivery_failed");
    assert_eq!(json["success"], false);
    assert!(json.get("videoUrl").is_none());
}
