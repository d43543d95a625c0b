use super::*;

#[test]
fn blank_input_is_absent() {
    assert_eq!(SourceLocator::parse(""), None);
    assert_eq!(SourceLocator::parse("   \t"), None);
    assert_eq!(SourceLocator::parse("file://"), None);
}

#[test]
fn urls_and_paths_are_distinguished() {
    assert_eq!(
        SourceLocator::parse(" https://cdn.example.com/a.mp4 "),
        Some(SourceLocator::Url("https://cdn.example.com/a.mp4".to_string()))
    );
    assert_eq!(
        SourceLocator::parse("uploads/clip.mp4"),
        Some(SourceLocator::Path(PathBuf::from("uploads/clip.mp4")))
    );
    assert_eq!(
        SourceLocator::parse("file:///tmp/clip.mp4"),
        Some(SourceLocator::Path(PathBuf::from("/tmp/clip.mp4")))
    );
}

#[test]
fn local_path_only_for_files() {
    let p = SourceLocator::parse("/tmp/a.mp4").unwrap();
    assert_eq!(p.local_path(), Some(Path::new("/tmp/a.mp4")));
    let u = SourceLocator::parse("HTTPS://x/a.mp4").unwrap();
    assert_eq!(u.local_path(), None);
}

#[test]
fn mp4_extension_ignores_query_and_case() {
    assert!(SourceLocator::parse("clip.MP4").unwrap().has_mp4_extension());
    assert!(
        SourceLocator::parse("https://x/clip.mp4?sig=abc#t=2")
            .unwrap()
            .has_mp4_extension()
    );
    assert!(!SourceLocator::parse("clip.mov").unwrap().has_mp4_extension());
}

#[test]
fn serde_shape_is_tagged() {
    let json = serde_json::to_value(SourceLocator::Url("https://x/a.mp4".into())).unwrap();
    assert_eq!(json["type"], "url");
    assert_eq!(json["value"], "https://x/a.mp4");
}
