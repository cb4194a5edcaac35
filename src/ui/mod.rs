//! Terminal status output for the command-line binary.
//!
//! Status lines are colored and go to stdout; logs go to stderr. The spinner
//! is only drawn when stdout is a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use crate::pipeline::RunReport;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Icon for a status.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Print a styled status line.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => println!("{} {}", icon.red().bold(), msg),
        Status::Warning => println!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
    }
}

pub fn fetching_message(author_id: &str) -> String {
    format!("Fetching publications for {}", author_id)
}

pub fn saved_message(count: usize, path: &Path) -> String {
    format!(
        "Saved {} publication{} to {}",
        format_number(count),
        if count == 1 { "" } else { "s" },
        path.display()
    )
}

/// One-line summary of the degraded parts of a run, if any
pub fn run_summary(report: &RunReport) -> Option<String> {
    let mut parts = Vec::new();
    if !report.skipped.is_empty() {
        parts.push(format!("{} skipped", report.skipped.len()));
    }
    if report.duplicates_removed > 0 {
        parts.push(format!("{} duplicates removed", report.duplicates_removed));
    }
    if report.abstract_failures > 0 {
        parts.push(format!("{} abstracts unavailable", report.abstract_failures));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Format a number with commas.
pub fn format_number(n: usize) -> String {
    n.to_string()
        .chars()
        .rev()
        .collect::<Vec<_>>()
        .chunks(3)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(",")
        .chars()
        .rev()
        .collect()
}

fn style(template: &str, ticks: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(ticks)
}

/// Spinner shown while a run is in progress.
pub struct RunSpinner {
    pb: ProgressBar,
}

impl RunSpinner {
    /// Start a spinner; hidden when stdout is not a terminal or `quiet` is set.
    pub fn start(msg: &str, quiet: bool) -> Self {
        let pb = if quiet || !is_terminal() {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        pb.set_style(style("{spinner:.cyan} {msg}", "⠁⠂⠄⡀⢀⠠⠐⠈ "));
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    pub fn finish_with_success(&self, msg: &str) {
        self.pb.set_style(style("{spinner:.green} {msg}", "✓✓"));
        self.pb.finish_with_message(msg.to_string());
    }

    pub fn finish_with_error(&self, msg: &str) {
        self.pb.set_style(style("{spinner:.red} {msg}", "✗✗"));
        self.pb.finish_with_message(msg.to_string());
    }

    pub fn is_hidden(&self) -> bool {
        self.pb.is_hidden()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SkippedUnit;

    #[test]
    fn test_status_messages() {
        assert_eq!(fetching_message("abc"), "Fetching publications for abc");
        assert_eq!(
            saved_message(1234, Path::new("out.json")),
            "Saved 1,234 publications to out.json"
        );
        assert_eq!(
            saved_message(1, Path::new("out.json")),
            "Saved 1 publication to out.json"
        );
    }

    #[test]
    fn test_run_summary() {
        assert_eq!(run_summary(&RunReport::default()), None);

        let report = RunReport {
            skipped: vec![SkippedUnit {
                index: 0,
                kind: "markup",
                reason: "captcha".to_string(),
            }],
            duplicates_removed: 2,
            ..RunReport::default()
        };
        assert_eq!(
            run_summary(&report).as_deref(),
            Some("1 skipped, 2 duplicates removed")
        );
    }

    #[test]
    fn test_quiet_spinner_is_hidden() {
        assert!(RunSpinner::start("working", true).is_hidden());
    }
}
