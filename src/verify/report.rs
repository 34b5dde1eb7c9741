//! Aggregated outcome of a verification run.

use crate::core::Location;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One finding, attributed to a source location when one is known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        match &self.location {
            Some(location) => write!(f, "{label}: {location}: {}", self.message),
            None => write!(f, "{label}: {}", self.message),
        }
    }
}

/// Counts and findings of one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Source units scanned
    pub files_checked: usize,

    /// Transition operations cross-referenced against a typestate
    pub transitions_checked: usize,

    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl VerifyReport {
    pub(crate) fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            files_checked: 0,
            transitions_checked: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }

    pub(crate) fn error(&mut self, location: Option<Location>, message: impl fmt::Display) {
        self.errors.push(Diagnostic {
            severity: Severity::Error,
            location,
            message: message.to_string(),
        });
    }

    pub(crate) fn warning(&mut self, location: Option<Location>, message: impl fmt::Display) {
        self.warnings.push(Diagnostic {
            severity: Severity::Warning,
            location,
            message: message.to_string(),
        });
    }

    /// Order findings by file, then line, and stamp the finish time.
    pub(crate) fn finish(mut self) -> Self {
        self.errors.sort_by(|a, b| a.location.cmp(&b.location));
        self.warnings.sort_by(|a, b| a.location.cmp(&b.location));
        self.finished_at = Utc::now();
        self
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Checked <N> files, <M> transitions`
    pub fn summary(&self) -> String {
        format!(
            "Checked {} files, {} transitions",
            self.files_checked, self.transitions_checked
        )
    }

    /// Warnings then errors, in report order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.warnings.iter().chain(self.errors.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn findings_are_sorted_by_file_then_line() {
        let mut report = VerifyReport::new(Utc::now());
        report.error(Some(Location::in_file("b.rs", 1, 1)), "late file");
        report.error(Some(Location::in_file("a.rs", 9, 1)), "late line");
        report.error(Some(Location::in_file("a.rs", 2, 5)), "first");
        let report = report.finish();

        let messages: Vec<_> = report.errors.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "late line", "late file"]);
        assert!(!report.is_success());
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn diagnostics_render_with_labels() {
        let mut report = VerifyReport::new(Utc::now());
        report.files_checked = 2;
        report.transitions_checked = 3;
        report.warning(Some(Location::in_file("lib.rs", 4, 8)), "unmarked");
        report.error(None, "dangling bridge");

        let lines: Vec<_> = report.diagnostics().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["WARNING: lib.rs:4:8: unmarked", "ERROR: dangling bridge"]);
        assert_eq!(report.summary(), "Checked 2 files, 3 transitions");
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = VerifyReport::new(Utc::now());
        report.error(Some(Location::in_file("lib.rs", 1, 1)), "bad");
        let json = serde_json::to_value(report.finish()).unwrap();
        assert_eq!(json["errors"][0]["severity"], "error");
        assert_eq!(json["files_checked"], 0);
    }
}
