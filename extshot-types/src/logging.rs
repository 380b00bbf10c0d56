//! Platform-specific logging directory resolution.

use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "extshot";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Returns the platform-appropriate directory for log files.
///
/// | Platform | Directory |
/// |----------|-----------|
/// | Linux | `$XDG_STATE_HOME/extshot/logs` or `~/.local/state/extshot/logs` |
/// | macOS | `~/Library/Logs/extshot` |
/// | Windows | `%LOCALAPPDATA%\extshot\extshot\logs` |
///
/// Falls back to a directory under the system temp dir when no home
/// directory can be determined.
pub fn log_dir() -> PathBuf {
    let Some(base) = project_dirs() else {
        return std::env::temp_dir().join(APP_NAME).join("logs");
    };

    #[cfg(target_os = "linux")]
    {
        base.state_dir()
            .unwrap_or_else(|| base.data_local_dir())
            .join("logs")
    }

    #[cfg(target_os = "macos")]
    {
        // data_local_dir is ~/Library/Application Support/extshot; logs go
        // to ~/Library/Logs/extshot.
        let library = base
            .data_local_dir()
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| base.data_local_dir().to_path_buf());
        library.join("Logs").join(APP_NAME)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        base.data_local_dir().join("logs")
    }
}

/// Ensures the log directory exists, creating it if necessary.
pub fn ensure_log_dir() -> Result<PathBuf, std::io::Error> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// File name prefix for the rolling application log.
///
/// The daily appender creates dated files such as `extshot.log.2026-03-01`.
pub const LOG_FILE_PREFIX: &str = "extshot.log";
