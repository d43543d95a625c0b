use super::*;

fn label() -> OverlayLabel {
    OverlayLabel::parse("dr. asha rao").unwrap()
}

#[test]
fn three_layers_in_paint_order() {
    let g = CanvasGeometry::template();
    let clip = SourceLocator::parse("uploads/clip.mp4").unwrap();
    let list = build_layers(&g, Path::new("public/template.png"), Some(&clip), &label());

    let zs: Vec<_> = list.layers.iter().map(Layer::z).collect();
    assert_eq!(zs, vec![Z_TEMPLATE, Z_VIDEO, Z_LABEL]);

    let image = list.image().unwrap();
    assert_eq!(image.rect, Rect::new(0.0, 0.0, 1080.0, 1920.0));
    assert_eq!(image.fit, Fit::Cover);

    let video = list.video().unwrap();
    assert_eq!(video.rect, g.video_rect);
    assert_eq!(video.start_frame, FrameIndex(0));
    assert_eq!(video.source, clip);

    let text = list.text().unwrap();
    assert_eq!(text.text, "Dr. Asha Rao");
    assert_eq!(text.center_x, 540.0);
}

#[test]
fn missing_clip_omits_video_layer_only() {
    let g = CanvasGeometry::template();
    let list = build_layers(&g, Path::new("t.png"), None, &label());
    assert_eq!(list.layers.len(), 2);
    assert!(list.video().is_none());
    assert!(list.image().is_some());
    assert!(list.text().is_some());
}

#[test]
fn layer_list_sorts_by_z() {
    let g = CanvasGeometry::template();
    let built = build_layers(&g, Path::new("t.png"), None, &label());
    let mut reversed = built.layers.clone();
    reversed.reverse();
    let list = LayerList::new(g.canvas, g.background, reversed);
    assert_eq!(list, built);
}

#[test]
fn serializes_as_tagged_variants() {
    let g = CanvasGeometry::template();
    let clip = SourceLocator::parse("https://x/a.mp4").unwrap();
    let json = serde_json::to_value(build_layers(&g, Path::new("t.png"), Some(&clip), &label()))
        .unwrap();
    let kinds: Vec<_> = json["layers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["image", "video", "text"]);
    assert_eq!(json["layers"][1]["fit"], "cover");
}
