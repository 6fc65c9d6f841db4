//! Terminal output helpers.
//!
//! Human-facing status lines go through here; diagnostics go through
//! `tracing`. Everything is written to stderr so stdout stays clean for
//! scripting.

mod format;
mod messages;

pub use format::{format_duration, print_build_summary};
pub use messages::{error, info, success, warning};

/// Whether the process runs under a CI service.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "JENKINS_URL", "HUDSON_URL"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Apply color preferences to `owo-colors`.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && crate::logger::should_use_colors();
    owo_colors::set_override(enabled);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn jenkins_counts_as_ci() {
        unsafe {
            std::env::set_var("JENKINS_URL", "http://ci.local/");
        }
        assert!(is_ci());
        unsafe {
            std::env::remove_var("JENKINS_URL");
        }
    }

    #[test]
    fn init_colors_without_color() {
        init_colors(true);
    }
}
