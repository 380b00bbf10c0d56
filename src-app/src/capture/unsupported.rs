//! Backend for platforms without a screen capture implementation.

use super::error::{CaptureError, EnumerationError};
use super::types::{FrameReceiver, StopHandle};
use super::CaptureBackend;
use extshot_types::DisplayInfo;

/// Reports no displays, so every capture ends with `NoDisplayFound`.
pub struct UnsupportedBackend;

impl UnsupportedBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnsupportedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for UnsupportedBackend {
    fn list_displays(&self) -> Result<Vec<DisplayInfo>, EnumerationError> {
        Err(EnumerationError::NotImplemented(format!(
            "screen capture is not available on {}",
            std::env::consts::OS
        )))
    }

    fn has_permission(&self) -> bool {
        false
    }

    fn request_permission(&self) {}

    fn start_display_capture(
        &self,
        _display: &DisplayInfo,
    ) -> Result<(FrameReceiver, StopHandle), CaptureError> {
        Err(CaptureError::StreamOpenFailed(format!(
            "screen capture is not available on {}",
            std::env::consts::OS
        )))
    }
}
