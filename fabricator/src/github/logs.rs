//! Plain-text job and step summaries.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::core::WorkflowJob;

/// Shown while a run has no jobs yet.
pub const WAITING_PLACEHOLDER: &str = "Waiting for job to start...";
/// Shown when jobs could not be fetched.
pub const ERROR_PLACEHOLDER: &str = "Error fetching logs";
/// Shown when jobs exist but produced no text.
pub const EMPTY_PLACEHOLDER: &str = "No logs available yet...";

/// How a [`LogReport`] was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LogState {
    /// The run has no jobs yet.
    Waiting,
    /// Summaries of at least one job.
    Ready,
    /// Jobs could not be fetched; `text` holds the error placeholder.
    Unavailable(String),
}

/// Log text plus a signal telling placeholder text apart from real output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogReport {
    /// Never empty.
    pub text: String,
    /// How the text was produced.
    #[serde(flatten)]
    pub state: LogState,
}

impl LogReport {
    /// Report for a run without jobs.
    #[must_use]
    pub fn waiting() -> Self {
        Self {
            text: WAITING_PLACEHOLDER.to_string(),
            state: LogState::Waiting,
        }
    }

    /// Report for a failed job fetch.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            text: ERROR_PLACEHOLDER.to_string(),
            state: LogState::Unavailable(reason.into()),
        }
    }

    /// Report summarizing `jobs`.
    #[must_use]
    pub fn from_jobs(jobs: &[WorkflowJob]) -> Self {
        if jobs.is_empty() {
            return Self::waiting();
        }
        let text = format_jobs(jobs);
        Self {
            text: if text.is_empty() { EMPTY_PLACEHOLDER.to_string() } else { text },
            state: LogState::Ready,
        }
    }

    /// True when the text came from a failed fetch.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self.state, LogState::Unavailable(_))
    }
}

/// Renders each job as a header, its status and conclusion, then one entry
/// per step.
#[must_use]
pub fn format_jobs(jobs: &[WorkflowJob]) -> String {
    let mut out = String::new();
    for job in jobs {
        let _ = write!(out, "\n=== Job: {} ===\n", job.id);
        let _ = writeln!(out, "Status: {}", job.status);
        if let Some(conclusion) = &job.conclusion {
            let _ = writeln!(out, "Conclusion: {conclusion}");
        }
        for step in &job.steps {
            let _ = write!(out, "\nStep {}: {}\n", step.number, step.name);
            let _ = write!(out, "  Status: {}", step.status);
            if let Some(conclusion) = &step.conclusion {
                let _ = write!(out, " | Conclusion: {conclusion}");
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_job;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_matches_layout() {
        let text = format_jobs(&[sample_job(7)]);
        assert_eq!(
            text,
            "\n=== Job: 7 ===\nStatus: in_progress\n\
             \nStep 1: Checkout\n  Status: completed | Conclusion: success\n\
             \nStep 2: Patch boot image\n  Status: in_progress\n"
        );
    }

    #[test]
    fn test_job_conclusion_line() {
        let mut job = sample_job(1);
        job.status = "completed".into();
        job.conclusion = Some("failure".into());
        job.steps.clear();
        assert_eq!(
            format_jobs(&[job]),
            "\n=== Job: 1 ===\nStatus: completed\nConclusion: failure\n"
        );
    }

    #[test]
    fn test_reports_are_never_empty() {
        assert_eq!(LogReport::from_jobs(&[]).text, WAITING_PLACEHOLDER);
        assert_eq!(LogReport::from_jobs(&[]).state, LogState::Waiting);

        let failed = LogReport::unavailable("GitHub API error (500): boom");
        assert_eq!(failed.text, ERROR_PLACEHOLDER);
        assert!(failed.is_unavailable());

        let ready = LogReport::from_jobs(&[sample_job(2)]);
        assert_eq!(ready.state, LogState::Ready);
        assert!(ready.text.contains("=== Job: 2 ==="));
    }
}
