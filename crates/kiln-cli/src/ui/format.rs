//! Durations and the end-of-build summary.

use std::time::Duration;

use console::Term;
use kiln_build::BuildReport;
use owo_colors::{OwoColorize, Stream::Stderr};

/// Format a duration as `50ms`, `1.50s` or `2m 5s`.
///
/// ```
/// use std::time::Duration;
/// use kiln_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

fn summary_lines(report: &BuildReport, elapsed: Duration) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        ("Output", report.out_dir.display().to_string()),
        ("Written", report.written.to_string()),
        ("Ignored", report.skipped.to_string()),
        ("Failed", report.failed.to_string()),
        ("Modules", report.manifest.modules.len().to_string()),
    ];
    if report.banners > 0 {
        lines.push(("Banners", report.banners.to_string()));
    }
    if let Some(minify) = report.minify {
        lines.push((
            "Minified",
            format!("{} ({} failed)", minify.minified, minify.failed),
        ));
    }
    lines.push(("Time", format_duration(elapsed)));
    lines
}

/// Print a build summary table to stderr.
pub fn print_build_summary(report: &BuildReport, elapsed: Duration) {
    let width = (Term::stderr().size().1 as usize).min(60);

    eprintln!(
        "\n{}",
        format!("Build {}", report.name).if_supports_color(Stderr, |t| t.bold().to_string())
    );
    eprintln!("{}", "─".repeat(width));
    for (label, value) in summary_lines(report, elapsed) {
        eprintln!(
            "  {:<9} {}",
            label.if_supports_color(Stderr, |t| t.dimmed().to_string()),
            value
        );
    }
    eprintln!("{}", "─".repeat(width));
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_build::finalize::MinifyReport;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn summary_mentions_optional_steps_only_when_run() {
        let mut report = BuildReport {
            name: "1".into(),
            written: 3,
            ..BuildReport::default()
        };
        let labels: Vec<_> = summary_lines(&report, Duration::ZERO)
            .into_iter()
            .map(|(label, _)| label)
            .collect();
        assert!(!labels.contains(&"Minified"));
        assert!(!labels.contains(&"Banners"));

        report.minify = Some(MinifyReport {
            minified: 2,
            failed: 1,
        });
        let lines = summary_lines(&report, Duration::ZERO);
        assert!(lines.contains(&("Minified", "2 (1 failed)".to_string())));
    }

    #[test]
    fn print_does_not_panic() {
        print_build_summary(&BuildReport::default(), Duration::from_millis(12));
    }
}
