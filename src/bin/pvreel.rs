use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pvreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the cube shape and axis types.
    Info(InfoArgs),
    /// Write one composite PNG per spatial-B index.
    Frames(FramesArgs),
    /// Encode previously written frames into an MP4 (requires `ffmpeg` on PATH).
    Video(VideoArgs),
    /// Write frames, then encode them.
    Run(FramesArgs),
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Input FITS cube.
    #[arg(long)]
    cube: PathBuf,
}

#[derive(Args, Debug)]
struct FramesArgs {
    /// Input FITS cube.
    #[arg(long)]
    cube: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct VideoArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// JSON config file; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset id used in frame and video file names.
    #[arg(long)]
    dataset_id: Option<String>,

    /// Panel title prefix (defaults to the dataset id).
    #[arg(long)]
    title: Option<String>,

    /// Directory for frames (and the default video path).
    #[arg(long = "out-dir")]
    output_directory: Option<PathBuf>,

    /// Output MP4 path.
    #[arg(long = "video")]
    video_path: Option<PathBuf>,

    /// Digits in the zero-padded frame index.
    #[arg(long = "padding")]
    frame_padding_width: Option<usize>,

    /// Video frames per second.
    #[arg(long = "fps")]
    frame_rate: Option<u32>,

    /// Reference map colour range as `MIN,MAX`.
    #[arg(long = "reference-range", value_parser = parse_range)]
    reference_range: Option<pvreel::IntensityRange>,

    /// PV slice colour range as `MIN,MAX`.
    #[arg(long = "slice-range", value_parser = parse_range)]
    slice_range: Option<pvreel::IntensityRange>,

    /// Panel height in pixels.
    #[arg(long)]
    panel_height: Option<u32>,

    /// Font family for titles and axis labels.
    #[arg(long)]
    font_family: Option<String>,

    /// Refuse to run if frames of this dataset already exist (default: replace them).
    #[arg(long, default_value_t = false)]
    fail_on_existing: bool,
}

impl CommonArgs {
    fn resolve(&self) -> anyhow::Result<pvreel::PvConfig> {
        let mut cfg = match &self.config {
            Some(path) => pvreel::PvConfig::from_path(path)
                .with_context(|| format!("load config '{}'", path.display()))?,
            None => pvreel::PvConfig::default(),
        };
        if let Some(v) = &self.dataset_id {
            cfg.dataset_id = v.clone();
        }
        if let Some(v) = &self.title {
            cfg.title = Some(v.clone());
        }
        if let Some(v) = &self.output_directory {
            cfg.output_directory = v.clone();
        }
        if let Some(v) = &self.video_path {
            cfg.video_path = Some(v.clone());
        }
        if let Some(v) = self.frame_padding_width {
            cfg.frame_padding_width = v;
        }
        if let Some(v) = self.frame_rate {
            cfg.frame_rate = v;
        }
        if let Some(v) = self.reference_range {
            cfg.reference_range = v;
        }
        if let Some(v) = self.slice_range {
            cfg.slice_range = v;
        }
        if let Some(v) = self.panel_height {
            cfg.panel_height = v;
        }
        if let Some(v) = &self.font_family {
            cfg.font_family = v.clone();
        }
        if self.fail_on_existing {
            cfg.existing_frames = pvreel::ExistingFrames::Fail;
        }
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }
}

fn parse_range(s: &str) -> Result<pvreel::IntensityRange, String> {
    let (min, max) = s
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX, got '{s}'"))?;
    let min: f64 = min.trim().parse().map_err(|e| format!("bad min '{min}': {e}"))?;
    let max: f64 = max.trim().parse().map_err(|e| format!("bad max '{max}': {e}"))?;
    pvreel::IntensityRange::new(min, max).map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Frames(args) => cmd_frames(&args).map(|_| ()),
        Command::Video(args) => cmd_video(&args.common.resolve()?),
        Command::Run(args) => {
            let cfg = cmd_frames(&args)?;
            cmd_video(&cfg)
        }
    }
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let cube = pvreel::Cube::load(&args.cube)
        .with_context(|| format!("load cube '{}'", args.cube.display()))?;
    let shape = cube.shape();
    let meta = cube.meta();
    println!("shape (spectral, rows, cols): {shape}");
    let [b, a, v] = meta.axis_types();
    println!("axis types: NAXIS1={} NAXIS2={} NAXIS3={}", or_dash(b), or_dash(a), or_dash(v));
    if let Some(object) = &meta.object {
        println!("object: {object}");
    }
    if let Some(bunit) = &meta.bunit {
        println!("bunit: {bunit}");
    }
    println!("frames: {}", shape.cols);
    Ok(())
}

fn or_dash(v: Option<&str>) -> &str {
    v.unwrap_or("-")
}

fn cmd_frames(args: &FramesArgs) -> anyhow::Result<pvreel::PvConfig> {
    let cfg = args.common.resolve()?;
    let cube = pvreel::Cube::load(&args.cube)
        .with_context(|| format!("load cube '{}'", args.cube.display()))?;

    let composer = pvreel::FrameComposer::new(
        cfg.style(),
        pvreel::AxisLabels::from_meta(cube.meta()),
        cfg.naming()?,
        &cfg.output_directory,
    )?;
    let driver = pvreel::SequenceDriver::new(composer, cfg.existing_frames);
    let stats = driver
        .run(&cube)
        .with_context(|| format!("write frames to '{}'", cfg.output_directory.display()))?;

    eprintln!(
        "wrote {} frame(s) to {}",
        stats.frames_written,
        cfg.output_directory.display()
    );
    Ok(cfg)
}

fn cmd_video(cfg: &pvreel::PvConfig) -> anyhow::Result<()> {
    let sequence = pvreel::FrameCollector::new(cfg.naming()?)
        .collect(&cfg.output_directory)
        .with_context(|| format!("collect frames in '{}'", cfg.output_directory.display()))?;

    let out = cfg.video_path();
    let stats = pvreel::assemble(&sequence, &out, cfg.frame_rate)
        .with_context(|| format!("encode '{}'", out.display()))?;

    eprintln!(
        "wrote {} ({} frames, {}x{} @ {} fps)",
        out.display(),
        stats.frames,
        stats.width,
        stats.height,
        stats.fps
    );
    Ok(())
}
