//! Error types for capture operations.

use std::fmt;

/// Terminal failure of a capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No capturable display, or the requested display is gone
    NoDisplayFound,
    /// Screen recording permission has not been granted
    PermissionDenied,
    /// The platform refused to open the stream, or it ended before a frame
    StreamOpenFailed(String),
    /// No frame arrived before the deadline
    CaptureTimeout,
    /// Capture was cancelled by the user or the application
    Cancelled,
    /// The selection is degenerate or lies outside the frame
    InvalidRegion(String),
    /// The image could not be encoded
    EncodeFailed(String),
    /// The image could not be written
    Io(String),
    /// Another capture is still running
    AlreadyInProgress,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoDisplayFound => write!(f, "No display available for capture"),
            CaptureError::PermissionDenied => write!(f, "Screen recording permission denied"),
            CaptureError::StreamOpenFailed(msg) => write!(f, "Failed to open capture stream: {}", msg),
            CaptureError::CaptureTimeout => write!(f, "Timed out waiting for a frame"),
            CaptureError::Cancelled => write!(f, "Capture cancelled"),
            CaptureError::InvalidRegion(msg) => write!(f, "Invalid region: {}", msg),
            CaptureError::EncodeFailed(msg) => write!(f, "Failed to encode image: {}", msg),
            CaptureError::Io(msg) => write!(f, "I/O error: {}", msg),
            CaptureError::AlreadyInProgress => write!(f, "A capture is already in progress"),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<CaptureError> for String {
    fn from(err: CaptureError) -> Self {
        err.to_string()
    }
}

/// Error type for display enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumerationError {
    /// Platform-specific enumeration error
    PlatformError(String),
    /// Feature not implemented on this platform
    NotImplemented(String),
}

impl fmt::Display for EnumerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumerationError::PlatformError(msg) => write!(f, "Enumeration error: {}", msg),
            EnumerationError::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
        }
    }
}

impl std::error::Error for EnumerationError {}

impl From<EnumerationError> for String {
    fn from(err: EnumerationError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CaptureError::StreamOpenFailed("denied".into()).to_string(),
            "Failed to open capture stream: denied"
        );
        let msg: String = CaptureError::CaptureTimeout.into();
        assert_eq!(msg, "Timed out waiting for a frame");
    }
}
