use super::*;
use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |k| map.get(k).cloned()
}

#[test]
fn defaults_match_delivery_contract() {
    let c = PipelineConfig::default();
    c.validate().unwrap();
    assert_eq!(c.fps, 30);
    assert_eq!(c.default_duration_secs, 10.0);
    assert_eq!(c.public_prefix, "/generated");
    assert_eq!(c.codec.crf, 23);
    assert_eq!(c.probe_timeout(), Duration::from_secs(10));
    assert_eq!(c.render_timeout(), Some(Duration::from_secs(600)));
}

#[test]
fn partial_json_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clipframe.json");
    std::fs::write(&path, r#"{"fps": 25, "codec": {"crf": 18}, "threads": 2}"#).unwrap();

    let c = PipelineConfig::from_path(&path).unwrap();
    assert_eq!(c.fps, 25);
    assert_eq!(c.codec.crf, 18);
    assert_eq!(c.codec.pix_fmt, "yuv420p");
    assert_eq!(c.threads, Some(2));
    assert_eq!(c.chunk_size, 32);
}

#[test]
fn malformed_json_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ fps: ").unwrap();
    assert!(matches!(
        PipelineConfig::from_path(&path),
        Err(ClipframeError::Config(_))
    ));
}

#[test]
fn env_overrides_apply_and_blank_values_are_ignored() {
    let c = PipelineConfig::default()
        .apply_overrides(env(&[
            ("CLIPFRAME_OUTPUT_DIR", "/srv/out"),
            ("CLIPFRAME_PARALLEL", "off"),
            ("CLIPFRAME_THREADS", "3"),
            ("CLIPFRAME_RENDER_TIMEOUT_SECS", "0"),
            ("CLIPFRAME_FONT", "  "),
        ]))
        .unwrap();
    assert_eq!(c.output_dir, PathBuf::from("/srv/out"));
    assert!(!c.parallel);
    assert_eq!(c.threads, Some(3));
    assert_eq!(c.render_timeout(), None);
    assert_eq!(c.font_path, PipelineConfig::default().font_path);
}

#[test]
fn bad_env_value_names_the_variable() {
    let err = PipelineConfig::default()
        .apply_overrides(env(&[("CLIPFRAME_FPS", "thirty")]))
        .unwrap_err();
    assert!(err.to_string().contains("CLIPFRAME_FPS"));
}

#[test]
fn validate_rejects_unusable_values() {
    let bad = [
        PipelineConfig {
            fps: 0,
            ..PipelineConfig::default()
        },
        PipelineConfig {
            default_duration_secs: f64::NAN,
            ..PipelineConfig::default()
        },
        PipelineConfig {
            chunk_size: 0,
            ..PipelineConfig::default()
        },
        PipelineConfig {
            threads: Some(0),
            ..PipelineConfig::default()
        },
    ];
    for c in bad {
        assert!(c.validate().is_err(), "{c:?}");
    }
}
