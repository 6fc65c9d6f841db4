//! Status lines on stderr.

use owo_colors::{OwoColorize, Stream::Stderr};

/// Print a success message to stderr.
///
/// ```no_run
/// kiln_cli::ui::success("Build 1700000000000 finished");
/// ```
pub fn success(message: &str) {
    eprintln!(
        "{} {}",
        "✓".if_supports_color(Stderr, |t| t.green().bold().to_string()),
        message
    );
}

pub fn info(message: &str) {
    eprintln!(
        "{} {}",
        "ℹ".if_supports_color(Stderr, |t| t.blue().bold().to_string()),
        message
    );
}

pub fn warning(message: &str) {
    eprintln!(
        "{} {}",
        "⚠".if_supports_color(Stderr, |t| t.yellow().bold().to_string()),
        message.if_supports_color(Stderr, |t| t.yellow())
    );
}

pub fn error(message: &str) {
    eprintln!(
        "{} {}",
        "✗".if_supports_color(Stderr, |t| t.red().bold().to_string()),
        message.if_supports_color(Stderr, |t| t.red())
    );
}
