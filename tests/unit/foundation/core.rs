use super::*;

#[test]
fn frame_range_contains_boundaries() {
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert!(!r.contains(FrameIndex(1)));
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
}

#[test]
fn frame_range_chunks_cover_range_without_gaps() {
    let r = FrameRange::new(FrameIndex(0), FrameIndex(222)).unwrap();
    let chunks = r.chunks(32).collect::<Vec<_>>();
    assert_eq!(chunks.len(), 7);
    assert_eq!(chunks[0].start, FrameIndex(0));
    assert_eq!(chunks.last().unwrap().end, FrameIndex(222));
    for w in chunks.windows(2) {
        assert_eq!(w[0].end, w[1].start);
    }
    let total: u64 = chunks.iter().map(|c| c.len_frames()).sum();
    assert_eq!(total, 222);
}

#[test]
fn fps_floor_matches_probed_duration() {
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.secs_to_frames_floor(7.4), 222);
    assert_eq!(fps.secs_to_frames_floor(10.0), 300);
    assert_eq!(fps.secs_to_frames_floor(0.01), 0);
}

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert_eq!(Fps::new(30000, 1001).unwrap().ffmpeg_rate(), "30000/1001");
}

#[test]
fn rgba_alpha_from_css_fraction() {
    assert_eq!(Rgba8::WHITE.with_alpha_f32(0.9).a, 230);
    assert_eq!(Rgba8::BLACK.with_alpha_f32(2.0).a, 255);
}
