//! Capture coordination.
//!
//! [`CaptureCoordinator`] owns the one-capture-at-a-time flag and the single
//! live overlay, and moves a request through overlay, transform, session and
//! persister. It runs on the main context: every method is called from the
//! event loop, and work that finishes elsewhere comes back as an
//! [`AppEvent`].

use crate::capture::{
    cancel_pair, primary_display, CancelHandle, CaptureBackend, CaptureError, CaptureSession,
    CapturedFrame,
};
use crate::events::{AppEvent, EventSink};
use crate::feedback::{LogNotifier, Notifier, SaveFeedback, SystemFeedback};
use crate::overlay::{
    OverlayHost, OverlayId, OverlayInput, OverlayOutcome, OverlayResponse, OverlaySurface,
    SelectionOverlay, READINESS_DELAY,
};
use crate::persist::{ImagePersister, PersistError};
use crate::transform::selection_to_device_rect;
use extshot_types::{CaptureRequest, DisplayInfo, PresetSize, Rect, ScreenTransformContext};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Which post-save effects run.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackOptions {
    pub reveal_in_file_browser: bool,
    pub play_sound: bool,
}

impl Default for FeedbackOptions {
    fn default() -> Self {
        Self {
            reveal_in_file_browser: true,
            play_sound: true,
        }
    }
}

struct ActiveOverlay {
    id: OverlayId,
    model: SelectionOverlay,
    surface: Box<dyn OverlaySurface>,
    display: DisplayInfo,
}

pub struct CaptureCoordinator {
    session: Arc<CaptureSession>,
    backend: Arc<dyn CaptureBackend>,
    host: Box<dyn OverlayHost>,
    persister: ImagePersister,
    feedback: Box<dyn SaveFeedback>,
    feedback_options: FeedbackOptions,
    notifier: Box<dyn Notifier>,
    sink: Arc<dyn EventSink>,
    runtime: Handle,
    in_progress: bool,
    /// Cancels the spawned session; set from finalize until `CaptureFinished`.
    pending_cancel: Option<CancelHandle>,
    overlay: Option<ActiveOverlay>,
    next_overlay_id: OverlayId,
}

impl CaptureCoordinator {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        host: Box<dyn OverlayHost>,
        persister: ImagePersister,
        sink: Arc<dyn EventSink>,
        runtime: Handle,
    ) -> Self {
        Self {
            session: Arc::new(CaptureSession::new(backend.clone())),
            backend,
            host,
            persister,
            feedback: Box::new(SystemFeedback),
            feedback_options: FeedbackOptions::default(),
            notifier: Box::new(LogNotifier),
            sink,
            runtime,
            in_progress: false,
            pending_cancel: None,
            overlay: None,
            next_overlay_id: 1,
        }
    }

    pub fn with_feedback(mut self, feedback: Box<dyn SaveFeedback>, options: FeedbackOptions) -> Self {
        self.feedback = feedback;
        self.feedback_options = options;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// True from an accepted request until its session or overlay ends.
    pub fn is_capturing(&self) -> bool {
        self.in_progress
    }

    /// Id of the live overlay, if one is open.
    pub fn overlay_id(&self) -> Option<OverlayId> {
        self.overlay.as_ref().map(|o| o.id)
    }

    /// Current selection of the live overlay, in view coordinates.
    pub fn overlay_selection(&self) -> Option<Rect> {
        self.overlay.as_ref().map(|o| o.model.selection())
    }

    pub fn session(&self) -> &Arc<CaptureSession> {
        &self.session
    }

    /// Open a selection overlay for `preset` on the main display.
    ///
    /// Ignored while another capture is in progress. Returns whether an
    /// overlay was opened.
    pub fn request_capture(&mut self, preset: PresetSize) -> bool {
        if self.in_progress {
            info!("Capture already in progress, ignoring {} request", preset);
            return false;
        }
        self.in_progress = true;
        self.close_overlay();

        let target = match primary_display(self.backend.as_ref()) {
            Ok(target) => target,
            Err(e) => {
                self.in_progress = false;
                self.notifier.notify_error("Capture Unavailable", &e.to_string());
                return false;
            }
        };

        let model = match SelectionOverlay::new(target.frame().size, preset) {
            Ok(model) => model,
            Err(e) => {
                warn!("Cannot select {} on display {}: {}", preset, target.id, e);
                self.in_progress = false;
                self.notifier.notify_error("Capture Unavailable", &e.to_string());
                return false;
            }
        };

        let id = self.next_overlay_id;
        self.next_overlay_id += 1;

        let mut surface = match self.host.open(id, &target) {
            Ok(surface) => surface,
            Err(e) => {
                warn!("Failed to open selection overlay: {}", e);
                self.in_progress = false;
                self.notifier.notify_error("Capture Unavailable", &e.to_string());
                return false;
            }
        };

        surface.render(&model.scene());
        info!(
            "Opened overlay {} for {} on display {} ({})",
            id, preset, target.id, target.name
        );
        self.overlay = Some(ActiveOverlay {
            id,
            model,
            surface,
            display: target,
        });
        self.sink.post_after(READINESS_DELAY, AppEvent::OverlayReady(id));
        true
    }

    /// Route a pipeline event. Hotkeys and shutdown belong to the caller.
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CaptureRequested(preset) => {
                self.request_capture(preset);
            }
            AppEvent::OverlayInput { id, input } => self.on_overlay_input(id, input),
            AppEvent::OverlayReady(id) => self.on_overlay_ready(id),
            AppEvent::OverlayRetry(id) => self.on_overlay_retry(id),
            AppEvent::CaptureFinished(result) => self.on_capture_finished(result),
            AppEvent::PersistFinished(result) => self.on_persist_finished(result),
            other => debug!("Coordinator ignoring {:?}", other),
        }
    }

    fn active_overlay(&mut self, id: OverlayId) -> Option<&mut ActiveOverlay> {
        match self.overlay.as_mut() {
            Some(active) if active.id == id => Some(active),
            _ => {
                debug!("Dropping event for stale overlay {}", id);
                None
            }
        }
    }

    fn on_overlay_input(&mut self, id: OverlayId, input: OverlayInput) {
        let Some(active) = self.active_overlay(id) else {
            return;
        };
        let response = active.model.handle_input(input);
        self.apply_response(id, response);
    }

    fn on_overlay_ready(&mut self, id: OverlayId) {
        if let Some(active) = self.active_overlay(id) {
            debug!("Overlay {} ready", id);
            active.model.mark_ready();
        }
    }

    fn on_overlay_retry(&mut self, id: OverlayId) {
        let Some(active) = self.active_overlay(id) else {
            return;
        };
        let response = active.model.retry_pending();
        self.apply_response(id, response);
    }

    fn apply_response(&mut self, id: OverlayId, response: OverlayResponse) {
        match response {
            OverlayResponse::None => {}
            OverlayResponse::Redraw => {
                if let Some(active) = self.overlay.as_mut() {
                    let scene = active.model.scene();
                    active.surface.render(&scene);
                }
            }
            OverlayResponse::Defer => {
                debug!("Overlay {} not ready, retrying confirmation", id);
                self.sink.post_after(READINESS_DELAY, AppEvent::OverlayRetry(id));
            }
            OverlayResponse::Emit(OverlayOutcome::Finalized(selection)) => self.finalize(selection),
            OverlayResponse::Emit(OverlayOutcome::Cancelled) => {
                info!("Selection cancelled");
                self.close_overlay();
                self.in_progress = false;
            }
        }
    }

    /// Turn a confirmed selection into a capture request and start the
    /// session.
    fn finalize(&mut self, selection: Rect) {
        let Some(mut active) = self.overlay.take() else {
            return;
        };
        let geometry = active.surface.geometry();
        let context = ScreenTransformContext::from_display(&active.display);
        active.surface.close();

        let device_rect = match selection_to_device_rect(
            selection,
            geometry.view_frame,
            geometry.window_origin,
            &context,
            geometry.bottom_left_origin,
        ) {
            Ok(rect) => rect,
            Err(e) => {
                warn!("Rejected selection {:?}: {}", selection, e);
                self.in_progress = false;
                self.notifier.notify_error("Capture Failed", &e.to_string());
                return;
            }
        };

        let request = CaptureRequest::new(device_rect, active.display.id, active.model.preset());
        debug!("Finalized selection {:?} -> {:?}", selection, request);

        let (handle, signal) = cancel_pair();
        self.pending_cancel = Some(handle);
        let session = self.session.clone();
        let sink = self.sink.clone();
        self.runtime.spawn(async move {
            let result = session.begin_capture_with(request, signal).await;
            sink.post(AppEvent::CaptureFinished(result));
        });
    }

    fn on_capture_finished(&mut self, result: Result<CapturedFrame, CaptureError>) {
        self.in_progress = false;
        self.pending_cancel = None;
        self.close_overlay();

        match result {
            Ok(frame) => {
                let persister = self.persister.clone();
                let sink = self.sink.clone();
                self.runtime.spawn(async move {
                    let result = tokio::task::spawn_blocking(move || persister.save(frame))
                        .await
                        .unwrap_or_else(|e| Err(PersistError::Io(format!("save task failed: {}", e))));
                    sink.post(AppEvent::PersistFinished(result));
                });
            }
            Err(CaptureError::Cancelled) => {}
            Err(CaptureError::AlreadyInProgress) => {
                warn!("Capture session was still busy");
            }
            Err(CaptureError::PermissionDenied) => {
                self.backend.request_permission();
                self.notifier.notify_error(
                    "Screen Recording Permission Required",
                    "Allow screen recording for ExtShot in System Settings, then try again.",
                );
            }
            Err(e) => self.notifier.notify_error("Capture Failed", &e.to_string()),
        }
    }

    fn on_persist_finished(&mut self, result: Result<PathBuf, PersistError>) {
        match result {
            Ok(path) => {
                if self.feedback_options.reveal_in_file_browser {
                    if let Err(e) = self.feedback.reveal(&path) {
                        warn!("Failed to reveal {}: {}", path.display(), e);
                    }
                }
                if self.feedback_options.play_sound {
                    if let Err(e) = self.feedback.play_completion_sound() {
                        warn!("Failed to play completion sound: {}", e);
                    }
                }
            }
            Err(e) => {
                error!("Failed to save screenshot: {}", e);
                self.notifier
                    .notify_error("Could Not Save Screenshot", &e.to_string());
            }
        }
    }

    /// Abandon the capture in progress, if any.
    ///
    /// An open overlay is closed immediately. A running session is asked to
    /// stop and reports back through `CaptureFinished`.
    pub fn cancel_capture(&mut self) {
        if self.overlay.is_some() {
            info!("Cancelling selection");
            self.close_overlay();
            self.in_progress = false;
            return;
        }
        if let Some(handle) = self.pending_cancel.take() {
            info!("Cancelling capture session");
            handle.cancel();
        }
    }

    /// Release the overlay and stop any running session.
    pub fn teardown(&mut self) {
        self.cancel_capture();
        self.in_progress = false;
    }

    fn close_overlay(&mut self) {
        if let Some(mut active) = self.overlay.take() {
            debug!("Closing overlay {}", active.id);
            active.surface.close();
        }
    }
}
