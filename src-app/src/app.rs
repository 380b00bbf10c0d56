//! Application context.
//!
//! [`AppContext`] owns the coordinator and the hotkey map for the lifetime
//! of the process. The shell creates it with [`AppContext::init`], feeds it
//! every [`AppEvent`] on the main context and calls
//! [`AppContext::teardown`] before exiting.

use crate::capture::CaptureBackend;
use crate::config::AppConfig;
use crate::coordinator::{CaptureCoordinator, FeedbackOptions};
use crate::events::{AppEvent, EventSink};
use crate::feedback::{Notifier, SaveFeedback};
use crate::hotkey::{HotkeyAction, HotkeyDispatcher, HotkeyId, HotkeyRegistrar, KeyCombination};
use crate::overlay::OverlayHost;
use crate::persist::ImagePersister;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Platform capabilities handed to [`AppContext::init`].
pub struct AppServices {
    pub backend: Arc<dyn CaptureBackend>,
    pub overlay_host: Box<dyn OverlayHost>,
    pub registrar: Box<dyn HotkeyRegistrar>,
    pub feedback: Box<dyn SaveFeedback>,
    pub notifier: Box<dyn Notifier>,
    pub sink: Arc<dyn EventSink>,
    pub runtime: Handle,
}

pub struct AppContext {
    coordinator: CaptureCoordinator,
    hotkeys: HotkeyDispatcher,
}

impl AppContext {
    /// Build the coordinator and register the configured hotkeys.
    ///
    /// Hotkeys that fail to register are logged and skipped.
    pub fn init(config: &AppConfig, output_dir: PathBuf, services: AppServices) -> Self {
        info!("Saving screenshots to {}", output_dir.display());
        let persister = ImagePersister::new(output_dir, config.output.file_prefix.clone());
        let options = FeedbackOptions {
            reveal_in_file_browser: config.output.reveal_in_file_browser,
            play_sound: config.output.play_sound,
        };

        let coordinator = CaptureCoordinator::new(
            services.backend,
            services.overlay_host,
            persister,
            services.sink,
            services.runtime,
        )
        .with_feedback(services.feedback, options)
        .with_notifier(services.notifier);

        let mut hotkeys = HotkeyDispatcher::new(services.registrar);
        for (index, binding) in config.hotkeys.iter().enumerate() {
            let id = index as HotkeyId + 1;
            let result = binding
                .combination
                .parse::<KeyCombination>()
                .and_then(|combo| hotkeys.register(combo, id, HotkeyAction::Capture(binding.preset)));
            if let Err(e) = result {
                warn!("Hotkey {} for {} is inactive: {}", binding.combination, binding.preset, e);
            }
        }

        Self {
            coordinator,
            hotkeys,
        }
    }

    pub fn coordinator(&self) -> &CaptureCoordinator {
        &self.coordinator
    }

    /// Handle one event. Returns `false` once the application should exit.
    pub fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Hotkey(os_id) => {
                if let Some(HotkeyAction::Capture(preset)) = self.hotkeys.dispatch(os_id) {
                    self.coordinator.request_capture(preset);
                }
                true
            }
            AppEvent::Shutdown => false,
            other => {
                self.coordinator.handle_event(other);
                true
            }
        }
    }

    /// Stop any capture and release the hotkeys.
    pub fn teardown(&mut self) {
        info!("Shutting down");
        self.coordinator.teardown();
        self.hotkeys.unregister_all();
    }
}

/// Drain `events` into `context` until shutdown or until every sender is
/// gone, then tear the context down.
pub async fn run_channel_loop(mut context: AppContext, mut events: mpsc::UnboundedReceiver<AppEvent>) {
    while let Some(event) = events.recv().await {
        if !context.handle_event(event) {
            break;
        }
    }
    context.teardown();
}
