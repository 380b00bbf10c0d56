//! Application events and their delivery to the main context.
//!
//! Everything that mutates coordinator state arrives as an [`AppEvent`] and
//! is handled in order on one context: the AppKit main queue on macOS, or a
//! channel drained by a single task elsewhere.

use crate::capture::{CaptureError, CapturedFrame};
use crate::hotkey::OsHotkeyId;
use crate::overlay::{OverlayId, OverlayInput};
use crate::persist::PersistError;
use extshot_types::PresetSize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug)]
pub enum AppEvent {
    /// A registered global hotkey fired
    Hotkey(OsHotkeyId),
    /// Menu or command-line request to capture with a preset
    CaptureRequested(PresetSize),
    /// Input from an overlay surface
    OverlayInput { id: OverlayId, input: OverlayInput },
    /// An overlay surface can take confirmations
    OverlayReady(OverlayId),
    /// Re-attempt a confirmation that arrived before the overlay was ready
    OverlayRetry(OverlayId),
    /// A capture session reached a terminal state
    CaptureFinished(Result<CapturedFrame, CaptureError>),
    /// An image finished saving
    PersistFinished(Result<PathBuf, PersistError>),
    Shutdown,
}

/// Delivers events to the main context from any thread.
pub trait EventSink: Send + Sync {
    fn post(&self, event: AppEvent);

    /// Deliver `event` once `delay` has elapsed.
    fn post_after(&self, delay: Duration, event: AppEvent);
}

/// [`EventSink`] backed by an unbounded tokio channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AppEvent>,
    runtime: Handle,
}

impl ChannelSink {
    /// Create a sink and the receiver the main loop drains.
    pub fn new(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, runtime }, rx)
    }
}

impl EventSink for ChannelSink {
    fn post(&self, event: AppEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("Event loop gone, dropping {:?}", e.0);
        }
    }

    fn post_after(&self, delay: Duration, event: AppEvent) {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        });
    }
}
