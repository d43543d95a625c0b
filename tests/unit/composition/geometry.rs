use super::*;

#[test]
fn template_constants() {
    let g = CanvasGeometry::template();
    assert_eq!((g.canvas.width, g.canvas.height), (1080, 1920));
    assert_eq!(g.video_rect, Rect::new(170.0, 380.0, 910.0, 1120.0));
    assert_eq!(g.label.top, 1180.0);
    assert_eq!(g.label.box_fill.a, 230);
    assert_eq!(g.background, Rgba8::WHITE);
    g.validate().unwrap();
}

#[test]
fn video_rect_outside_canvas_is_rejected() {
    let mut g = CanvasGeometry::template();
    g.video_rect = Rect::new(500.0, 380.0, 1240.0, 1120.0);
    assert!(g.validate().is_err());
}

#[test]
fn label_overlapping_video_is_rejected() {
    let mut g = CanvasGeometry::template();
    g.label.top = 1000.0;
    assert!(g.validate().is_err());
}

#[test]
fn odd_canvas_is_rejected() {
    let mut g = CanvasGeometry::template();
    g.canvas.width = 1081;
    assert!(g.validate().is_err());
}

#[test]
fn label_box_respects_min_width_and_centering() {
    let g = CanvasGeometry::template();
    let narrow = g.label_box(100.0, 60.0);
    assert_eq!(narrow.width(), 400.0);
    assert_eq!(narrow.height(), 80.0);
    assert_eq!(narrow.center().x, 540.0);
    assert_eq!(narrow.y0, 1180.0);

    let wide = g.label_box(600.0, 60.0);
    assert_eq!(wide.width(), 680.0);
    assert_eq!(wide.center().x, 540.0);
}

#[test]
fn scaled_geometry_stays_valid_and_even() {
    let g = CanvasGeometry::template().scaled(0.1).unwrap();
    assert_eq!((g.canvas.width, g.canvas.height), (108, 192));
    assert_eq!(g.video_rect, Rect::new(17.0, 38.0, 91.0, 112.0));
    assert!((g.label.font_size_px - 5.0).abs() < 1e-4);
    assert!(CanvasGeometry::template().scaled(0.0).is_err());
}
