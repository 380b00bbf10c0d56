//! macOS shell: an accessory application living in the status bar.

mod main_queue;
mod overlay;
mod status_menu;

use crate::app::{AppContext, AppServices};
use crate::capture::PlatformBackend;
use crate::config::AppConfig;
use crate::events::{AppEvent, EventSink};
use crate::feedback::{Notifier, SystemFeedback};
use crate::hotkey::{forward_hotkey_events, GlobalHotkeyRegistrar, HotkeyRegistrar, InertRegistrar};
use extshot_types::PresetSize;
use main_queue::MainQueueSink;
use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy};
use objc2_foundation::MainThreadMarker;
use overlay::PanelHost;
use status_menu::StatusMenu;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{error, warn};

/// Shows errors in a modal alert via `osascript`, off the main thread.
pub struct AlertNotifier;

impl Notifier for AlertNotifier {
    fn notify_error(&self, title: &str, message: &str) {
        error!("{}: {}", title, message);
        let script = format!(
            "display alert {} message {} as critical",
            applescript_string(title),
            applescript_string(message)
        );
        std::thread::spawn(move || {
            if let Err(e) = Command::new("osascript").arg("-e").arg(&script).status() {
                warn!("Failed to show alert: {}", e);
            }
        });
    }
}

fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Run the AppKit event loop until the user quits. Must be called on the
/// main thread.
pub fn run(
    config: &AppConfig,
    output_dir: PathBuf,
    initial_capture: Option<PresetSize>,
    runtime: &Runtime,
) {
    let Some(mtm) = MainThreadMarker::new() else {
        error!("The macOS shell must run on the main thread");
        return;
    };

    let app = NSApplication::sharedApplication(mtm);
    app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);

    let sink: Arc<dyn EventSink> = Arc::new(MainQueueSink);

    let registrar: Box<dyn HotkeyRegistrar> = match GlobalHotkeyRegistrar::new() {
        Ok(registrar) => {
            forward_hotkey_events(sink.clone());
            Box::new(registrar)
        }
        Err(e) => {
            warn!("Global hotkeys disabled: {}", e);
            Box::new(InertRegistrar)
        }
    };

    let context = AppContext::init(
        config,
        output_dir,
        AppServices {
            backend: Arc::new(PlatformBackend::new()),
            overlay_host: Box::new(PanelHost::new(mtm, sink.clone())),
            registrar,
            feedback: Box::new(SystemFeedback),
            notifier: Box::new(AlertNotifier),
            sink: sink.clone(),
            runtime: runtime.handle().clone(),
        },
    );
    main_queue::install(context);

    let _status_menu = StatusMenu::install(mtm, sink.clone());

    if let Some(preset) = initial_capture {
        sink.post(AppEvent::CaptureRequested(preset));
    }

    app.run();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applescript_string_escapes_quotes() {
        assert_eq!(applescript_string(r#"say "hi" \ bye"#), r#""say \"hi\" \\ bye""#);
    }
}
