use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use astrohq::image_pipeline::capture::{
    HduOptions, HostPaths, HostStatus, PiHqCamera, ReplayBackend, SensorClock, bracket_file_name,
    exposure_bracket, sequence_path,
};
use astrohq::image_pipeline::fits::read_image;
use astrohq::image_pipeline::{
    BayerPattern, Boundary, ConversionConfig, FrameStats, PackedBufferReader, PackingScheme,
    RawFormat, RawImageReader, RawToTiffPipeline, ReconstructionMode, TiffCompression,
};
use astrohq::logger;

use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(version, about = "Raspberry Pi HQ camera tools for astronomy")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Convert a raw sensor dump to TIFF, optionally debayered
    Convert(ConvertArgs),
    /// Capture FITS frames from a recorded raw frame and its metadata
    Capture(CaptureArgs),
    /// Capture one FITS frame per exposure of an evenly spaced bracket
    Bracket(BracketArgs),
    /// Print summary statistics of a FITS file or raw dump
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
struct GeometryArgs {
    /// Frame width in pixels
    #[arg(long)]
    width: usize,
    /// Frame height in pixels
    #[arg(long)]
    height: usize,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    input: PathBuf,
    output: PathBuf,
    #[command(flatten)]
    geometry: GeometryArgs,
    /// packed12in16 or native16le
    #[arg(long, default_value = "packed12in16")]
    scheme: PackingScheme,
    /// Meaningful bits per sample, if not the scheme's nominal depth
    #[arg(long)]
    bits: Option<u32>,
    /// Reconstruct RGB before writing
    #[arg(long)]
    debayer: bool,
    #[arg(long, default_value = "RGGB")]
    pattern: BayerPattern,
    /// mosaic, neighbor or bilinear
    #[arg(long, default_value = "bilinear")]
    mode: ReconstructionMode,
    /// nearest or mirror
    #[arg(long, default_value = "nearest")]
    boundary: Boundary,
    /// none, lzw, deflate-fast, deflate, deflate-best
    #[arg(long, default_value = "none")]
    compression: TiffCompression,
    /// TIFF predictor (2 = horizontal differencing)
    #[arg(long)]
    predictor: Option<u16>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Raw frame as captured from the unpacked raw stream
    #[arg(long)]
    raw: PathBuf,
    /// libcamera metadata of that frame, as JSON
    #[arg(long)]
    metadata: PathBuf,
    #[command(flatten)]
    geometry: GeometryArgs,
    /// libcamera raw format name
    #[arg(long, default_value = "SRGGB12")]
    format: RawFormat,
    #[arg(long)]
    telescope: Option<String>,
    /// Focal length in millimetres
    #[arg(long)]
    focal_length: Option<f64>,
    /// Keep the full frame instead of the scaler crop window
    #[arg(long)]
    no_crop: bool,
}

#[derive(Args, Debug)]
struct CaptureArgs {
    #[command(flatten)]
    replay: ReplayArgs,
    /// Exposure time in seconds
    #[arg(short = 't', long, default_value_t = 1.0)]
    exposure: f64,
    /// Analog gain setting
    #[arg(short, long, default_value_t = 1.0)]
    gain: f64,
    /// Number of frames to capture in sequence
    #[arg(short, long, default_value_t = 1)]
    number: usize,
    /// Output FITS path; `{}` is replaced by the frame index
    #[arg(short, long, default_value = "test.fits")]
    out_file: String,
}

#[derive(Args, Debug)]
struct BracketArgs {
    #[command(flatten)]
    replay: ReplayArgs,
    #[arg(long, default_value_t = 1.0)]
    start: f64,
    #[arg(long, default_value_t = 31.0)]
    stop: f64,
    /// Number of exposures
    #[arg(short = 'N', default_value_t = 16)]
    count: usize,
    #[arg(long, default_value_t = 1.0)]
    gain: f64,
    /// Directory for the bracket files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// FITS file, or raw dump when --width and --height are given
    input: PathBuf,
    #[arg(long, requires = "height")]
    width: Option<usize>,
    #[arg(long, requires = "width")]
    height: Option<usize>,
    #[arg(long, default_value = "packed12in16")]
    scheme: PackingScheme,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_with_default(if cli.verbose { "debug" } else { "info" });

    info!("Execution start: {} UTC", Utc::now());

    match cli.cmd {
        Cmd::Convert(args) => convert(args),
        Cmd::Capture(args) => capture(args),
        Cmd::Bracket(args) => bracket(args),
        Cmd::Stats(args) => stats(args),
    }
}

fn convert(args: ConvertArgs) -> Result<()> {
    let mut reader = PackedBufferReader::new(args.geometry.width, args.geometry.height, args.scheme);
    if let Some(bits) = args.bits {
        reader = reader.with_bits_per_sample(bits);
    }

    let config = ConversionConfig::builder()
        .compression(args.compression)
        .predictor(args.predictor)
        .debayer(args.debayer)
        .pattern(args.pattern)
        .mode(args.mode)
        .boundary(args.boundary)
        .build();
    let pipeline = RawToTiffPipeline::new(reader, config);

    info!("RAW to TIFF pipeline initialized");
    info!("Compression: {:?}", pipeline.config().compression);
    info!(
        "Debayering: {}",
        if pipeline.config().debayer {
            "enabled"
        } else {
            "disabled"
        }
    );

    pipeline
        .convert_file(&args.input, &args.output)
        .with_context(|| format!("converting {}", args.input.display()))?;
    info!("Conversion successful!");
    Ok(())
}

fn system_clock() -> SensorClock {
    match SensorClock::system() {
        Ok(clock) => {
            if !clock.is_synchronized() {
                warn!("System clock is not NTP synchronized; timestamps may be off");
            }
            clock
        }
        Err(e) => {
            warn!("Boot time unavailable ({e}), using the current time");
            SensorClock::unsynchronized(Utc::now())
        }
    }
}

fn open_camera(replay: &ReplayArgs, gain: f64) -> Result<PiHqCamera<ReplayBackend>> {
    let backend = ReplayBackend::from_files(
        &replay.raw,
        &replay.metadata,
        replay.geometry.width,
        replay.geometry.height,
        replay.format.unpacked(),
    )
    .context("loading recorded frame")?
    .with_host_status(HostStatus::probe(&HostPaths::default()));

    let mut options = HduOptions::default().crop(!replay.no_crop);
    options.telescope = replay.telescope.clone();
    options.focal_length = replay.focal_length;

    let camera = PiHqCamera::new(backend, system_clock(), gain)?.with_options(options);
    match HostPaths::default().tuning_file {
        Some(path) => info!("Tuning file: {}", path.display()),
        None => info!("Tuning file: <default>"),
    }
    Ok(camera)
}

fn capture(args: CaptureArgs) -> Result<()> {
    if args.number == 0 {
        bail!("--number must be at least 1");
    }
    let mut camera = open_camera(&args.replay, args.gain)?;
    camera.set_exposure(args.exposure)?;
    info!("Configuration: {:?}", camera.controls()?);

    if args.number == 1 {
        camera
            .start_and_capture_fits(&args.out_file)
            .with_context(|| format!("capturing {}", args.out_file))?;
    } else {
        camera.start()?;
        for i in 0..args.number {
            let path = sequence_path(&args.out_file, i);
            camera
                .capture_fits(&path)
                .with_context(|| format!("capturing {}", path.display()))?;
            info!("Captured {}", path.display());
        }
    }
    camera.stop()?;
    Ok(())
}

fn bracket(args: BracketArgs) -> Result<()> {
    let mut camera = open_camera(&args.replay, args.gain)?;

    for exposure in exposure_bracket(args.start, args.stop, args.count)? {
        camera.set_exposure(exposure)?;
        let path = args.out_dir.join(bracket_file_name(exposure));
        camera
            .start_and_capture_fits(&path)
            .with_context(|| format!("capturing {}", path.display()))?;
        camera.stop()?;
        info!(exposure, "Captured {}", path.display());
    }
    Ok(())
}

fn stats(args: StatsArgs) -> Result<()> {
    let data = match (args.width, args.height) {
        (Some(width), Some(height)) => {
            let bytes = std::fs::read(&args.input)
                .with_context(|| format!("reading {}", args.input.display()))?;
            PackedBufferReader::new(width, height, args.scheme).read_raw(&bytes)?.data
        }
        _ => read_image(&args.input).with_context(|| format!("reading {}", args.input.display()))?,
    };

    let stats = FrameStats::compute(data.view())?;
    println!("{}", args.input.display());
    print!("{stats}");
    Ok(())
}
