//! ExtShot: fixed-size region screenshots from a global hotkey.

pub mod app;
pub mod capture;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod feedback;
pub mod hotkey;
pub mod logging;
pub mod overlay;
pub mod persist;
pub mod platform;
pub mod transform;

use clap::Parser;
use extshot_types::PresetSize;
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line flags of the app binary.
#[derive(Parser, Debug)]
#[command(name = "extshot", version, about = "Fixed-size region screenshots")]
struct Args {
    /// Open the selection overlay once at startup (large, small or WxH)
    #[arg(long, value_name = "PRESET")]
    capture: Option<PresetSize>,

    /// Directory for saved screenshots
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

/// Application entry point.
pub fn run() {
    let args = Args::parse();
    let _log_guard = logging::init_logging();
    info!("ExtShot {} starting (pid: {})", env!("CARGO_PKG_VERSION"), std::process::id());

    let config = config::load_config();
    let output_dir = match config::resolve_output_dir(&config, args.output_dir.as_deref()) {
        Ok(dir) => dir,
        Err(e) => {
            error!("No output directory: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    platform::run(&config, output_dir, args.capture, &runtime);
    info!("ExtShot stopped");
}
