use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clipframe", version)]
struct Cli {
    /// JSON pipeline config (every field optional).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a clip into the template and print the JSON response (requires `ffmpeg`).
    Render(RenderArgs),
    /// Print `ffprobe` metadata for a local clip as JSON.
    Probe(ProbeArgs),
    /// Render a single composed frame as a PNG.
    Frame(FrameArgs),
    /// Print the layer list for a clip and label as JSON.
    Layers(LayersArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Clip path or URL.
    #[arg(long)]
    video: String,

    /// Label drawn below the clip.
    #[arg(long)]
    label: String,

    /// Local copy of the clip used for probing.
    #[arg(long)]
    local_path: Option<PathBuf>,

    /// Declared upload content type.
    #[arg(long)]
    content_type: Option<String>,

    /// Skip rendering and answer with the source clip.
    #[arg(long, default_value_t = false)]
    preview_only: bool,

    /// Override the output directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Rasterize on a single thread.
    #[arg(long, default_value_t = false)]
    serial: bool,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Local clip path.
    #[arg(long)]
    video: PathBuf,

    /// Probe timeout in seconds.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Clip path or URL; omit for template and label only.
    #[arg(long)]
    video: Option<String>,

    /// Label drawn below the clip.
    #[arg(long)]
    label: String,

    /// Frame index (0-based).
    #[arg(long, default_value_t = 0)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Render at a fraction of the full 1080x1920 size.
    #[arg(long)]
    scale: Option<f64>,
}

#[derive(Parser, Debug)]
struct LayersArgs {
    /// Clip path or URL; omit for template and label only.
    #[arg(long)]
    video: Option<String>,

    /// Label drawn below the clip.
    #[arg(long)]
    label: String,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Render(args) => cmd_render(cfg, args),
        Command::Probe(args) => cmd_probe(args),
        Command::Frame(args) => cmd_frame(cfg, args),
        Command::Layers(args) => cmd_layers(cfg, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<clipframe::PipelineConfig> {
    let cfg = match path {
        Some(p) => clipframe::PipelineConfig::from_path(p)?,
        None => clipframe::PipelineConfig::default(),
    };
    Ok(cfg.apply_env()?)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value).context("serialize JSON output")?;
    println!("{s}");
    Ok(())
}

fn cmd_render(mut cfg: clipframe::PipelineConfig, args: RenderArgs) -> anyhow::Result<()> {
    if let Some(dir) = args.out_dir {
        cfg.output_dir = dir;
    }
    if args.serial {
        cfg.parallel = false;
    }
    if args.threads.is_some() {
        cfg.threads = args.threads;
    }

    let req = clipframe::GenerateRequest {
        video: args.video,
        content_type: args.content_type,
        local_path: args.local_path,
        label: args.label,
        mode: if args.preview_only {
            clipframe::DeliveryMode::PreviewOnly
        } else {
            clipframe::DeliveryMode::Render
        },
    };

    let resp = match clipframe::Pipeline::new(cfg) {
        Ok(pipeline) => {
            let cancel = pipeline.cancel_token();
            clipframe::handle_generate(&pipeline, &req, &cancel)
        }
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            clipframe::GenerateResponse::failure(&e)
        }
    };
    print_json(&resp)?;
    if !resp.success {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let probe = clipframe::probe_media(&args.video, Duration::from_secs(args.timeout_secs))?;
    print_json(&probe)
}

fn cmd_frame(cfg: clipframe::PipelineConfig, args: FrameArgs) -> anyhow::Result<()> {
    let mut pipeline = clipframe::Pipeline::new(cfg)?;
    if let Some(scale) = args.scale {
        let geometry = pipeline.geometry().scaled(scale)?;
        pipeline = pipeline.with_geometry(geometry)?;
    }
    let job = pipeline.build_job(clipframe::JobInputs {
        video: args
            .video
            .as_deref()
            .and_then(clipframe::SourceLocator::parse),
        probe_path: None,
        label: clipframe::OverlayLabel::parse(&args.label)?,
    })?;
    let cancel = pipeline.cancel_token();
    let frame = pipeline.render_frame(&job, clipframe::FrameIndex(args.frame), &cancel)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_layers(cfg: clipframe::PipelineConfig, args: LayersArgs) -> anyhow::Result<()> {
    let label = match clipframe::OverlayLabel::parse(&args.label) {
        Ok(l) => l,
        Err(e) => {
            print_json(&clipframe::GenerateResponse::failure(&e))?;
            std::process::exit(1);
        }
    };
    let video = args
        .video
        .as_deref()
        .and_then(clipframe::SourceLocator::parse);
    let layers = clipframe::build_layers(
        &clipframe::CanvasGeometry::template(),
        &cfg.template_path,
        video.as_ref(),
        &label,
    );
    print_json(&layers)
}
