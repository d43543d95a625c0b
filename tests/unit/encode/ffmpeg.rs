use super::*;
use crate::foundation::core::Fps;

fn cfg(audio: Option<&str>) -> SinkConfig {
    SinkConfig {
        width: 1080,
        height: 1920,
        fps: Fps::new(30, 1).unwrap(),
        frame_count: 222,
        audio_source: audio.map(OsString::from),
    }
}

fn args_as_strings(args: &[OsString]) -> Vec<String> {
    args.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn value_after(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

#[test]
fn default_codec_params_match_delivery_settings() {
    let c = CodecParams::default();
    assert_eq!(c.video_codec, "libx264");
    assert_eq!(c.crf, 23);
    assert_eq!(c.pix_fmt, "yuv420p");
    assert_eq!(c.audio_codec, "aac");
    assert_eq!(c.audio_bitrate, "128k");
    c.validate().unwrap();
}

#[test]
fn crf_out_of_range_is_rejected() {
    let c = CodecParams {
        crf: 60,
        ..CodecParams::default()
    };
    assert!(c.validate().is_err());
}

#[test]
fn args_without_audio_disable_audio_stream() {
    let opts = FfmpegSinkOpts::new("out/.video-1.mp4.partial");
    let args = args_as_strings(&build_ffmpeg_args(&opts, &cfg(None)));

    assert_eq!(args[0], "-y");
    assert_eq!(value_after(&args, "-s").as_deref(), Some("1080x1920"));
    assert_eq!(value_after(&args, "-r").as_deref(), Some("30/1"));
    assert_eq!(value_after(&args, "-crf").as_deref(), Some("23"));
    assert_eq!(value_after(&args, "-c:v").as_deref(), Some("libx264"));
    assert_eq!(value_after(&args, "-t").as_deref(), Some("7.400000"));
    assert!(args.iter().any(|a| a == "-an"));
    assert!(!args.iter().any(|a| a == "1:a:0?"));
    // The temp path has no .mp4 extension, so the muxer is forced.
    assert_eq!(value_after(&args, "-f").as_deref(), Some("rawvideo"));
    assert_eq!(args[args.len() - 2], "mp4");
    assert_eq!(args.last().unwrap(), "out/.video-1.mp4.partial");
}

#[test]
fn args_with_audio_map_optional_stream() {
    let opts = FfmpegSinkOpts::new("out.mp4");
    let args = args_as_strings(&build_ffmpeg_args(&opts, &cfg(Some("in.mp4"))));

    let inputs: Vec<_> = args
        .iter()
        .enumerate()
        .filter(|(_, a)| *a == "-i")
        .map(|(i, _)| args[i + 1].clone())
        .collect();
    assert_eq!(inputs, vec!["pipe:0".to_string(), "in.mp4".to_string()]);
    assert!(args.iter().any(|a| a == "1:a:0?"));
    assert_eq!(value_after(&args, "-b:a").as_deref(), Some("128k"));
    assert!(!args.iter().any(|a| a == "-an"));
}

#[test]
fn overwrite_false_uses_no_clobber_flag() {
    let mut opts = FfmpegSinkOpts::new("out.mp4");
    opts.overwrite = false;
    let args = args_as_strings(&build_ffmpeg_args(&opts, &cfg(None)));
    assert_eq!(args[0], "-n");
}

#[test]
fn flatten_transparent_pixel_returns_background() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg(&mut dst, &src, Rgba8::opaque(10, 20, 30)).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_opaque_pixel_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg(&mut dst, &src, Rgba8::WHITE).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn flatten_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(flatten_premul_over_bg(&mut dst, &[0u8; 4], Rgba8::WHITE).is_err());
}

#[test]
fn begin_rejects_odd_dimensions() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("unused.mp4"));
    let mut c = cfg(None);
    c.width = 1081;
    assert!(matches!(sink.begin(c), Err(ClipframeError::Encoding(_))));
}

#[test]
fn push_before_begin_is_an_error() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("unused.mp4"));
    let frame = FrameRGBA {
        width: 2,
        height: 2,
        data: vec![0; 16],
        premultiplied: true,
    };
    assert!(sink.push_frame(FrameIndex(0), &frame).is_err());
}
