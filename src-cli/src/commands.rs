//! CLI command implementations.

use crate::colors;
use crate::exit_codes::ExitCode;
use crate::CaptureOptions;
use extshot_lib::capture::{
    cancel_pair, primary_display, CaptureBackend, CaptureError, CaptureSession, PlatformBackend,
};
use extshot_lib::config;
use extshot_lib::overlay::{OverlayError, SelectionOverlay};
use extshot_lib::persist::ImagePersister;
use extshot_lib::transform::selection_to_device_rect;
use extshot_types::{CaptureRequest, DisplayInfo, PixelRect, PresetSize, Rect, ScreenTransformContext};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Serialize)]
struct PresetEntry {
    name: Option<&'static str>,
    width: u32,
    height: u32,
    /// Whether output is resampled to exactly `width × height` pixels
    exact_output: bool,
}

/// List the built-in presets.
pub fn presets(json: bool) -> ExitCode {
    let entries: Vec<PresetEntry> = PresetSize::CATALOGUE
        .iter()
        .map(|p| PresetEntry {
            name: p.name(),
            width: p.width,
            height: p.height,
            exact_output: p.is_large(),
        })
        .collect();

    if json {
        return print_json(&entries);
    }

    println!(
        "{}  {}  {}",
        colors::pad_left("NAME", 6, colors::header),
        colors::pad_left("SIZE", 10, colors::header),
        colors::header("OUTPUT")
    );
    println!("{}  {}  {}", "-".repeat(6), "-".repeat(10), "-".repeat(6));
    for entry in entries {
        let output = if entry.exact_output {
            format!("{}x{} px", entry.width, entry.height)
        } else {
            "native resolution".to_string()
        };
        println!(
            "{}  {}  {}",
            colors::pad_left(entry.name.unwrap_or("-"), 6, colors::bold),
            colors::pad_left(&format!("{}x{}", entry.width, entry.height), 10, colors::number),
            output
        );
    }
    ExitCode::Success
}

/// List connected displays.
pub fn displays(json: bool, quiet: bool) -> ExitCode {
    let backend = PlatformBackend::new();
    let displays = match backend.list_displays() {
        Ok(displays) => displays,
        Err(e) => {
            report_error(json, quiet, &e.to_string());
            return ExitCode::GeneralError;
        }
    };

    if json {
        return print_json(&displays);
    }
    if displays.is_empty() {
        if !quiet {
            println!("{}", colors::dim("No displays found."));
        }
        return ExitCode::Success;
    }

    let id_width = displays
        .iter()
        .map(|d| d.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);
    let name_width = displays
        .iter()
        .map(|d| d.name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{}  {}  {}  {}  {}  {}",
        colors::pad_left("ID", id_width, colors::header),
        colors::pad_left("NAME", name_width, colors::header),
        colors::pad_left("SIZE (PT)", 11, colors::header),
        colors::pad_left("POSITION", 11, colors::header),
        colors::pad_left("SCALE", 5, colors::header),
        colors::header("PRIMARY")
    );
    println!(
        "{}  {}  {}  {}  {}  {}",
        "-".repeat(id_width),
        "-".repeat(name_width),
        "-".repeat(11),
        "-".repeat(11),
        "-".repeat(5),
        "-".repeat(7)
    );
    for display in &displays {
        println!(
            "{}  {:<name_width$}  {:<11}  {:<11}  {:<5}  {}",
            colors::pad_left(&display.id.to_string(), id_width, colors::number),
            display.name,
            format!("{}x{}", display.width, display.height),
            format!("{},{}", display.x, display.y),
            format!("{}x", display.scale_factor),
            if display.is_primary { colors::yes() } else { colors::no() }
        );
    }
    ExitCode::Success
}

/// Capture a preset-sized region and save it.
pub async fn capture(options: CaptureOptions, json: bool, quiet: bool) -> ExitCode {
    let backend: Arc<dyn CaptureBackend> = Arc::new(PlatformBackend::new());

    let target = match find_display(backend.as_ref(), options.display) {
        Ok(target) => target,
        Err(e) => {
            report_error(json, quiet, &e.to_string());
            return ExitCode::from(&e);
        }
    };

    let selection = match plan_selection(&target, options.preset, options.x, options.y) {
        Ok(selection) => selection,
        Err(e) => {
            report_error(json, quiet, &e.to_string());
            return ExitCode::InvalidArguments;
        }
    };
    let device_rect = match device_rect_for(&target, selection) {
        Ok(rect) => rect,
        Err(e) => {
            report_error(json, quiet, &e.to_string());
            return ExitCode::from(&e);
        }
    };
    debug!(
        "Selection {:?} on display {} -> device {:?}",
        selection, target.id, device_rect
    );

    let app_config = config::load_config();
    let output_dir = match config::resolve_output_dir(&app_config, options.output_dir.as_deref()) {
        Ok(dir) => dir,
        Err(e) => {
            report_error(json, quiet, &e);
            return ExitCode::SaveFailed;
        }
    };

    let session = CaptureSession::new(backend.clone());
    let (handle, signal) = cancel_pair();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    let result = session
        .begin_capture_with(
            CaptureRequest::new(device_rect, target.id, options.preset),
            signal,
        )
        .await;
    ctrl_c.abort();

    let frame = match result {
        Ok(frame) => frame,
        Err(e) => {
            report_error(json, quiet, &e.to_string());
            if e == CaptureError::PermissionDenied {
                backend.request_permission();
                if !json && !quiet {
                    eprintln!(
                        "{}",
                        colors::hint("grant Screen Recording access in System Settings, then retry")
                    );
                }
            }
            return ExitCode::from(&e);
        }
    };

    let (width, height) = (frame.width(), frame.height());
    let persister = ImagePersister::new(output_dir, app_config.output.file_prefix.clone());
    let saved = match tokio::task::spawn_blocking(move || persister.save(frame)).await {
        Ok(Ok(path)) => path,
        Ok(Err(e)) => {
            report_error(json, quiet, &e.to_string());
            return ExitCode::SaveFailed;
        }
        Err(e) => {
            report_error(json, quiet, &format!("Save task failed: {}", e));
            return ExitCode::GeneralError;
        }
    };

    if json {
        return print_json(&json!({
            "path": saved,
            "preset": options.preset,
            "display": target.id,
            "width": width,
            "height": height,
        }));
    }
    print_saved(&saved, width, height, quiet);
    ExitCode::Success
}

/// Show version information.
pub fn version(json: bool) {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!("{}", json!({ "version": version }));
    } else {
        println!("{} {}", colors::bold("extshot-cli"), version);
    }
}

/// Resolve `--display`, or the primary display when absent.
fn find_display(
    backend: &dyn CaptureBackend,
    id: Option<u32>,
) -> Result<DisplayInfo, CaptureError> {
    let Some(id) = id else {
        return primary_display(backend);
    };
    backend
        .list_displays()
        .map_err(|_| CaptureError::NoDisplayFound)?
        .into_iter()
        .find(|d| d.id == id)
        .ok_or(CaptureError::NoDisplayFound)
}

/// Selection in display-local points: centred like the overlay starts, or
/// with its top-left corner at `(x, y)`. Fails when the preset does not fit
/// on the display.
fn plan_selection(
    display: &DisplayInfo,
    preset: PresetSize,
    x: Option<f64>,
    y: Option<f64>,
) -> Result<Rect, OverlayError> {
    let centred = SelectionOverlay::new(display.frame().size, preset)?.selection();
    Ok(match (x, y) {
        (Some(x), Some(y)) => Rect::new(x, y, centred.width(), centred.height()),
        _ => centred,
    })
}

/// The selection as the overlay would report it: a top-left view covering
/// the whole display.
fn device_rect_for(display: &DisplayInfo, selection: Rect) -> Result<PixelRect, CaptureError> {
    let frame = display.frame();
    selection_to_device_rect(
        selection,
        Rect::new(0.0, 0.0, frame.width(), frame.height()),
        frame.origin,
        &ScreenTransformContext::from_display(display),
        false,
    )
}

fn print_saved(path: &Path, width: u32, height: u32, quiet: bool) {
    let shown = path.display().to_string();
    if quiet {
        println!("{}", shown);
    } else {
        println!(
            "{} {} {}",
            colors::success(&format!("Saved {}x{} screenshot to", width, height)),
            colors::path(&shown),
            colors::dim("(PNG)")
        );
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("{}", colors::error(&format!("Failed to serialize output: {}", e)));
            ExitCode::GeneralError
        }
    }
}

fn report_error(json: bool, quiet: bool, message: &str) {
    if json {
        println!("{}", json!({ "error": message }));
    } else if !quiet {
        eprintln!("{}", colors::error(message));
    }
}
