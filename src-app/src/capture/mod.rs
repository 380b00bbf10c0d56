//! Screen capture.
//!
//! Platform backends open a display stream and hand frames over a channel;
//! [`session::CaptureSession`] drives one capture attempt on top of that.

pub mod error;
pub mod process;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(not(target_os = "macos"))]
pub mod unsupported;

pub use error::{CaptureError, EnumerationError};
pub use session::{cancel_pair, CancelHandle, CancelSignal, CaptureSession, SessionState, CAPTURE_TIMEOUT};
pub use types::{CapturedFrame, FrameReceiver, RawFrame, StopHandle};

#[cfg(target_os = "macos")]
pub use macos::MacOSBackend as PlatformBackend;
#[cfg(not(target_os = "macos"))]
pub use unsupported::UnsupportedBackend as PlatformBackend;

use extshot_types::DisplayInfo;

/// Platform capabilities the capture pipeline depends on.
pub trait CaptureBackend: Send + Sync {
    /// List connected displays, primary first.
    fn list_displays(&self) -> Result<Vec<DisplayInfo>, EnumerationError>;

    /// Whether screen recording permission is currently granted.
    fn has_permission(&self) -> bool;

    /// Ask the OS to prompt for screen recording permission.
    fn request_permission(&self);

    /// Open a stream of full-resolution BGRA frames of `display`.
    ///
    /// Returns a frame receiver and a handle that stops the stream.
    fn start_display_capture(
        &self,
        display: &DisplayInfo,
    ) -> Result<(FrameReceiver, StopHandle), CaptureError>;
}

/// Find the display the overlay should appear on: the primary display, or
/// the first one reported.
pub fn primary_display(backend: &dyn CaptureBackend) -> Result<DisplayInfo, CaptureError> {
    let displays = backend.list_displays().map_err(|e| {
        tracing::warn!("Display enumeration failed: {}", e);
        CaptureError::NoDisplayFound
    })?;
    displays
        .iter()
        .find(|d| d.is_primary)
        .or_else(|| displays.first())
        .cloned()
        .ok_or(CaptureError::NoDisplayFound)
}
