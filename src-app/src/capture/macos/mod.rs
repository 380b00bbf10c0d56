//! macOS capture backend built on ScreenCaptureKit and Core Graphics.

mod displays;
mod stream;

use super::error::{CaptureError, EnumerationError};
use super::types::{FrameReceiver, StopHandle};
use super::CaptureBackend;
use extshot_types::DisplayInfo;

// Core Graphics FFI for permission checks
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGPreflightScreenCaptureAccess() -> bool;
    fn CGRequestScreenCaptureAccess() -> bool;
}

/// macOS implementation of [`CaptureBackend`].
pub struct MacOSBackend;

impl MacOSBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacOSBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for MacOSBackend {
    fn list_displays(&self) -> Result<Vec<DisplayInfo>, EnumerationError> {
        displays::list_displays()
    }

    fn has_permission(&self) -> bool {
        unsafe { CGPreflightScreenCaptureAccess() }
    }

    /// Shows the system prompt the first time and adds the app to the
    /// Screen Recording list in System Settings.
    fn request_permission(&self) {
        unsafe { CGRequestScreenCaptureAccess() };
    }

    fn start_display_capture(
        &self,
        display: &DisplayInfo,
    ) -> Result<(FrameReceiver, StopHandle), CaptureError> {
        stream::start_display_capture(display.id, display.pixel_width(), display.pixel_height())
            .map_err(CaptureError::StreamOpenFailed)
    }
}
