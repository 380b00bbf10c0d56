//! User-facing side effects: revealing saved files, completion sound, and
//! error messages.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{error, warn};

#[cfg(target_os = "macos")]
const COMPLETION_SOUND: &str = "/System/Library/Sounds/Pop.aiff";

/// Effects run after an image is saved. Failures are reported to the caller,
/// who logs them; they never fail the capture.
pub trait SaveFeedback {
    /// Show `path` selected in the platform file browser.
    fn reveal(&self, path: &Path) -> io::Result<()>;

    fn play_completion_sound(&self) -> io::Result<()>;
}

/// Shows errors the user needs to act on.
pub trait Notifier {
    fn notify_error(&self, title: &str, message: &str);
}

/// [`SaveFeedback`] using the platform's command-line helpers.
pub struct SystemFeedback;

impl SaveFeedback for SystemFeedback {
    fn reveal(&self, path: &Path) -> io::Result<()> {
        #[cfg(target_os = "macos")]
        {
            spawn_detached(Command::new("open").arg("-R").arg(path))
        }

        #[cfg(target_os = "windows")]
        {
            spawn_detached(Command::new("explorer").arg(format!("/select,{}", path.display())))
        }

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            let dir = path.parent().unwrap_or(path);
            spawn_detached(Command::new("xdg-open").arg(dir))
        }
    }

    fn play_completion_sound(&self) -> io::Result<()> {
        #[cfg(target_os = "macos")]
        {
            spawn_detached(Command::new("afplay").arg(COMPLETION_SOUND))
        }

        #[cfg(not(target_os = "macos"))]
        {
            Ok(())
        }
    }
}

/// Start `command` without waiting for it; a thread reaps the child.
fn spawn_detached(command: &mut Command) -> io::Result<()> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    std::thread::spawn(move || {
        if let Err(e) = child.wait() {
            warn!("Failed to wait for helper process: {}", e);
        }
    });
    Ok(())
}

/// [`Notifier`] that only logs.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, title: &str, message: &str) {
        error!("{}: {}", title, message);
    }
}
