//! Exit codes for the CLI.
//!
//! These codes enable scripting integration by providing structured
//! feedback about operation results.

use extshot_lib::capture::CaptureError;

/// Exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,
    /// General/unspecified error
    GeneralError = 1,
    /// Invalid command-line arguments
    InvalidArguments = 2,
    /// No display matched the request
    NoDisplay = 3,
    /// Screen recording permission has not been granted
    PermissionDenied = 4,
    /// The capture stream failed or timed out
    CaptureFailed = 5,
    /// The screenshot could not be written
    SaveFailed = 6,
    /// Capture was cancelled (Ctrl+C)
    UserCancelled = 8,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&CaptureError> for ExitCode {
    fn from(err: &CaptureError) -> Self {
        match err {
            CaptureError::NoDisplayFound => ExitCode::NoDisplay,
            CaptureError::PermissionDenied => ExitCode::PermissionDenied,
            CaptureError::InvalidRegion(_) => ExitCode::InvalidArguments,
            CaptureError::Cancelled => ExitCode::UserCancelled,
            CaptureError::EncodeFailed(_) | CaptureError::Io(_) => ExitCode::SaveFailed,
            CaptureError::StreamOpenFailed(_)
            | CaptureError::CaptureTimeout
            | CaptureError::AlreadyInProgress => ExitCode::CaptureFailed,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitCode::Success => write!(f, "success"),
            ExitCode::GeneralError => write!(f, "general error"),
            ExitCode::InvalidArguments => write!(f, "invalid arguments"),
            ExitCode::NoDisplay => write!(f, "no display"),
            ExitCode::PermissionDenied => write!(f, "permission denied"),
            ExitCode::CaptureFailed => write!(f, "capture failed"),
            ExitCode::SaveFailed => write!(f, "save failed"),
            ExitCode::UserCancelled => write!(f, "user cancelled"),
        }
    }
}
