//! Application shells.
//!
//! On macOS the shell is an accessory AppKit application with a status menu
//! and an overlay panel. Elsewhere the app runs headless: events are drained
//! from a channel and overlay requests report that no window system is
//! available.

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "macos")]
pub use macos::run;

#[cfg(not(target_os = "macos"))]
pub use headless::run;

#[cfg(not(target_os = "macos"))]
mod headless {
    use crate::app::{run_channel_loop, AppContext, AppServices};
    use crate::capture::PlatformBackend;
    use crate::config::AppConfig;
    use crate::events::{AppEvent, ChannelSink, EventSink};
    use crate::feedback::{LogNotifier, SystemFeedback};
    use crate::hotkey::{forward_hotkey_events, GlobalHotkeyRegistrar, HotkeyRegistrar, InertRegistrar};
    use crate::overlay::HeadlessHost;
    use extshot_types::PresetSize;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::runtime::Runtime;
    use tracing::warn;

    /// Run until Ctrl-C.
    pub fn run(
        config: &AppConfig,
        output_dir: PathBuf,
        initial_capture: Option<PresetSize>,
        runtime: &Runtime,
    ) {
        let (sink, events) = ChannelSink::new(runtime.handle().clone());
        let sink: Arc<dyn EventSink> = Arc::new(sink);

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
                overlay_host: Box::new(HeadlessHost),
                registrar,
                feedback: Box::new(SystemFeedback),
                notifier: Box::new(LogNotifier),
                sink: sink.clone(),
                runtime: runtime.handle().clone(),
            },
        );

        if let Some(preset) = initial_capture {
            sink.post(AppEvent::CaptureRequested(preset));
        }

        let shutdown = sink.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.post(AppEvent::Shutdown);
            }
        });

        runtime.block_on(run_channel_loop(context, events));
    }
}
