//! helio - solar image processing CLI
//!
//! Small operator's tool over the pipeline crates: inspect FITS products,
//! apply geometric transforms and stretches, dump statistics.

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

/// Initialize tracing based on verbosity level.
fn init_tracing(verbose: u8, log_path: Option<&PathBuf>) {
    let filter = match verbose {
        0 => "warn",
        1 => "helio=info",
        2 => "helio=debug",
        _ => "helio=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if let Some(path) = log_path {
        let log_dir = path.parent().unwrap_or(Path::new("."));
        let log_filename = path.file_name().unwrap_or(std::ffi::OsStr::new("helio.log"));
        let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .with_ansi(false)
            .with_writer(file_appender)
            .init();
    } else if verbose > 0 {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .init();
    }
}

#[derive(Parser)]
#[command(name = "helio")]
#[command(author, version, about = "Solar image processing CLI")]
#[command(long_about = "
Operator's tool over the HELIO-RS pipeline.

Examples:
  helio info scan.fits                  # Header + metadata summary
  helio info scan.fits --stats          # Plus per-image statistics
  helio rotate scan.fits -o out.fits -a 45 --resize
  helio flip scan.fits -o out.fits --direction vertical
  helio autostretch scan.fits -o out.fits
  helio stats scan.fits --masked        # Disk-masked statistics
  helio mask scan.fits -o out.fits --fill 0 --outside 65535
  helio clv scan.fits --bins 20         # Limb-darkening curve
  helio ephemeris -d 2024-05-04T10:30:00
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write log to file instead of stderr
    #[arg(short = 'l', long = "log", global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show image info and metadata
    Info(InfoArgs),
    /// Rotate by an arbitrary angle
    Rotate(RotateArgs),
    /// Mirror horizontally or vertically
    Flip(FlipArgs),
    /// SIRIL-style MTF autostretch
    Autostretch(AutostretchArgs),
    /// Image statistics
    Stats(StatsArgs),
    /// Fill the fitted disk ellipse
    Mask(MaskArgs),
    /// Center-to-limb variation curve
    Clv(ClvArgs),
    /// Solar orientation angles (P, B0, L0) for a date
    Ephemeris(EphemerisArgs),
}

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub input: PathBuf,

    /// Also compute per-image statistics
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args)]
pub struct RotateArgs {
    /// Input FITS file
    pub input: PathBuf,

    /// Output FITS file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Rotation angle in degrees (counterclockwise)
    #[arg(short, long, allow_hyphen_values = true)]
    pub angle: f64,

    /// Grow the canvas to the rotated bounding box
    #[arg(long)]
    pub resize: bool,

    /// Fill value for uncovered pixels
    #[arg(long, default_value_t = 0.0)]
    pub blackpoint: f32,
}

/// Mirror direction.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FlipDirection {
    /// Left-right mirror.
    Horizontal,
    /// Top-bottom mirror.
    Vertical,
}

#[derive(Args)]
pub struct FlipArgs {
    /// Input FITS file
    pub input: PathBuf,

    /// Output FITS file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Mirror direction
    #[arg(long, value_enum, default_value_t = FlipDirection::Horizontal)]
    pub direction: FlipDirection,
}

#[derive(Args)]
pub struct AutostretchArgs {
    /// Input FITS file
    pub input: PathBuf,

    /// Output FITS file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Target background level in [0, 1)
    #[arg(long, default_value_t = 0.25)]
    pub target_background: f64,

    /// Shadow clip point, in MAD units below the median
    #[arg(long, default_value_t = -2.8, allow_hyphen_values = true)]
    pub shadows_clip: f64,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Input FITS file
    pub input: PathBuf,

    /// Restrict to the pixels inside the fitted disk ellipse
    #[arg(long)]
    pub masked: bool,
}

#[derive(Args)]
pub struct ClvArgs {
    /// Input FITS file (must carry a disk ellipse)
    pub input: PathBuf,

    /// Number of mu bins
    #[arg(long, default_value_t = 16)]
    pub bins: usize,
}

#[derive(Args)]
pub struct EphemerisArgs {
    /// ISO-8601 instant, e.g. 2024-05-04T10:30:00 (defaults to now)
    #[arg(short, long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct MaskArgs {
    /// Input FITS file
    pub input: PathBuf,

    /// Output FITS file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Fill value inside the ellipse
    #[arg(long, default_value_t = 65535.0)]
    pub fill: f32,

    /// Fill value outside the ellipse (omit to keep the background)
    #[arg(long)]
    pub outside: Option<f32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log.as_ref());

    match cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Rotate(args) => commands::rotate::run(args, cli.verbose),
        Commands::Flip(args) => commands::flip::run(args, cli.verbose),
        Commands::Autostretch(args) => commands::autostretch::run(args, cli.verbose),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Mask(args) => commands::mask::run(args, cli.verbose),
        Commands::Clv(args) => commands::clv::run(args),
        Commands::Ephemeris(args) => commands::ephemeris::run(args),
    }
}
