//! ExtShot Command-Line Interface
//!
//! Headless access to the capture pipeline: list presets and displays, and
//! take a preset-sized screenshot of a display region without the overlay.

mod colors;
mod commands;
mod exit_codes;

use clap::{Args, Parser, Subcommand};
use exit_codes::ExitCode;
use extshot_types::PresetSize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ExtShot - Region Screenshot CLI
#[derive(Parser, Debug)]
#[command(name = "extshot-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose output (capture pipeline logs on stderr)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the built-in preset sizes
    Presets,
    /// List connected displays
    Displays,
    /// Capture a preset-sized region and save it as PNG
    Capture(CaptureOptions),
    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct CaptureOptions {
    /// Preset: large, small or <width>x<height> (points)
    #[arg(short, long)]
    preset: PresetSize,

    /// Display ID (use 'extshot-cli displays' to find); defaults to the primary display
    #[arg(short, long)]
    display: Option<u32>,

    /// Left edge of the selection, in points from the display's left edge
    #[arg(long, requires = "y", allow_hyphen_values = true)]
    x: Option<f64>,

    /// Top edge of the selection, in points from the display's top edge
    #[arg(long, requires = "x", allow_hyphen_values = true)]
    y: Option<f64>,

    /// Directory for the PNG (overrides config and EXTSHOT_OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", colors::error(&format!("Failed to create Tokio runtime: {}", e)));
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    };

    let exit_code = runtime.block_on(run(cli));
    std::process::exit(exit_code.as_i32());
}

async fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Commands::Presets => commands::presets(cli.json),
        Commands::Displays => commands::displays(cli.json, cli.quiet),
        Commands::Capture(options) => commands::capture(options, cli.json, cli.quiet).await,
        Commands::Version => {
            commands::version(cli.json);
            ExitCode::Success
        }
    }
}
