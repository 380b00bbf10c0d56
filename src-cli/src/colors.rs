//! Terminal color support for CLI output.
//!
//! Styling is applied only when the target stream is a terminal, so piped or
//! redirected output stays plain.

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

/// Pad `msg` to `width` columns, then style it. Padding first keeps ANSI
/// codes out of the width calculation.
pub fn pad_left<F>(msg: &str, width: usize, color_fn: F) -> String
where
    F: FnOnce(&str) -> String,
{
    color_fn(&format!("{:<width$}", msg))
}

/// Check if stdout is a terminal (interactive mode).
pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal()
}

fn on_stdout(msg: &str, style: impl FnOnce(&str) -> String) -> String {
    if is_interactive() {
        style(msg)
    } else {
        msg.to_string()
    }
}

/// A `label: msg` line for stderr, with a colored label on terminals.
fn labelled(label: &str, msg: &str, style: impl FnOnce(&str) -> String) -> String {
    if std::io::stderr().is_terminal() {
        format!("{} {}", style(label), msg)
    } else {
        format!("{} {}", label, msg)
    }
}

pub fn error(msg: &str) -> String {
    labelled("error:", msg, |l| l.red().bold().to_string())
}

/// Follow-up advice printed after an error.
pub fn hint(msg: &str) -> String {
    labelled("hint:", msg, |l| l.yellow().bold().to_string())
}

pub fn success(msg: &str) -> String {
    on_stdout(msg, |m| m.green().to_string())
}

pub fn dim(msg: &str) -> String {
    on_stdout(msg, |m| m.dimmed().to_string())
}

pub fn bold(msg: &str) -> String {
    on_stdout(msg, |m| m.bold().to_string())
}

/// Table column headers.
pub fn header(msg: &str) -> String {
    on_stdout(msg, |m| m.bold().blue().to_string())
}

pub fn path(msg: &str) -> String {
    on_stdout(msg, |m| m.underline().to_string())
}

/// Display IDs and sizes.
pub fn number(msg: &str) -> String {
    on_stdout(msg, |m| m.cyan().to_string())
}

pub fn yes() -> String {
    on_stdout("yes", |m| m.green().to_string())
}

pub fn no() -> String {
    on_stdout("no", |m| m.dimmed().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_left_pads_before_styling() {
        let padded = pad_left("ID", 6, |s| format!("[{}]", s));
        assert_eq!(padded, "[ID    ]");
    }
}
