//! Turning monitor views into text.

use std::fmt::Write as _;

use super::state::{MonitorView, Placard, RunSnapshot};
use crate::github::LogReport;
use crate::utils::{format_bytes, format_timestamp};

/// Receives every view the monitor produces, in order.
pub trait RunRenderer: Send + Sync {
    /// Shows `view`.
    fn render(&self, view: &MonitorView);
}

/// Styling class of one log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineClass {
    /// Mentions an error or failure.
    Error,
    /// Mentions success or completion.
    Success,
    /// Everything else.
    Plain,
}

/// Classifies a log line by keyword, case-insensitively. Error keywords win.
#[must_use]
pub fn classify_line(line: &str) -> LineClass {
    let lower = line.to_lowercase();
    if lower.contains("error") || lower.contains("failed") {
        LineClass::Error
    } else if lower.contains("success") || lower.contains("completed") {
        LineClass::Success
    } else {
        LineClass::Plain
    }
}

/// Log text split into classified lines.
#[must_use]
pub fn log_lines(logs: &LogReport) -> Vec<(LineClass, &str)> {
    logs.text.lines().map(|line| (classify_line(line), line)).collect()
}

/// Plain-text rendering of a view.
#[must_use]
pub fn render_text(view: &MonitorView) -> String {
    let mut out = String::new();
    match view {
        MonitorView::Polling { snapshot } => {
            write_snapshot(&mut out, snapshot);
            write_artifacts(&mut out, snapshot, None);
        }
        MonitorView::Complete { snapshot, placard } => {
            write_snapshot(&mut out, snapshot);
            write_artifacts(&mut out, snapshot, *placard);
        }
        MonitorView::Errored { panel } => {
            let _ = writeln!(out, "Error loading workflow run #{}", panel.run_id);
            let _ = writeln!(out, "{}", panel.message);
            let _ = writeln!(out);
            let _ = writeln!(out, "This could be due to:");
            for cause in &panel.causes {
                let _ = writeln!(out, "  - {cause}");
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "Back to patcher: {}", panel.back);
        }
    }
    out
}

fn write_snapshot(out: &mut String, snapshot: &RunSnapshot) {
    let run = &snapshot.run;
    let _ = writeln!(out, "Workflow Run #{}", snapshot.run_id);
    let _ = writeln!(out, "Status:  {}", run.display_state());
    let _ = writeln!(out, "Started: {}", format_timestamp(&run.created_at));
    let _ = writeln!(out, "Updated: {}", format_timestamp(&run.updated_at));
    if !run.html_url.is_empty() {
        let _ = writeln!(out, "URL:     {}", run.html_url);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Logs");
    let _ = writeln!(out, "----");
    let _ = writeln!(out, "{}", snapshot.logs.text.trim_matches('\n'));
}

fn write_artifacts(out: &mut String, snapshot: &RunSnapshot, placard: Option<Placard>) {
    let _ = writeln!(out);
    let _ = writeln!(out, "Artifacts");
    let _ = writeln!(out, "---------");
    if snapshot.artifacts.is_empty() {
        let placard = placard.unwrap_or(Placard::NoArtifacts);
        let _ = writeln!(out, "{} {}", placard.icon(), placard.message());
        return;
    }
    for artifact in &snapshot.artifacts {
        let _ = writeln!(
            out,
            "  [{}] {} ({}, {})",
            artifact.id,
            artifact.name,
            format_bytes(artifact.size_in_bytes),
            format_timestamp(&artifact.created_at)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RunConclusion, RunId};
    use crate::monitor::ErrorPanel;
    use crate::testing::{completed_run, in_progress_run, sample_artifact, sample_job};

    fn snapshot_of(run: crate::core::WorkflowRun, artifacts: Vec<crate::core::Artifact>) -> RunSnapshot {
        RunSnapshot {
            run_id: run.id,
            run,
            logs: LogReport::from_jobs(&[sample_job(11)]),
            artifacts,
        }
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line("Build FAILED"), LineClass::Error);
        assert_eq!(classify_line("error: no space left"), LineClass::Error);
        assert_eq!(classify_line("  Status: completed | Conclusion: success"), LineClass::Success);
        assert_eq!(classify_line("  Status: completed | Conclusion: failure"), LineClass::Success);
        assert_eq!(classify_line("Completed with errors"), LineClass::Error);
        assert_eq!(classify_line("Step 2: Patch boot image"), LineClass::Plain);
    }

    #[test]
    fn test_render_polling() {
        let text = render_text(&MonitorView::Polling {
            snapshot: snapshot_of(in_progress_run(77), Vec::new()),
        });
        assert!(text.starts_with("Workflow Run #77\nStatus:  in_progress\n"));
        assert!(text.contains("=== Job: 11 ==="));
        assert!(text.contains("No artifacts available yet."));
    }

    #[test]
    fn test_render_complete_with_artifacts() {
        let view = MonitorView::from_snapshot(snapshot_of(
            completed_run(8, RunConclusion::Success),
            vec![sample_artifact(3, "patched-boot", 2 * 1024 * 1024)],
        ));
        let text = render_text(&view);
        assert!(text.contains("Status:  success"));
        assert!(text.contains("  [3] patched-boot (2 MB, 2024-05-01 10:10:00 UTC)"));
        assert!(!text.contains("No artifacts"));
    }

    #[test]
    fn test_render_failure_placard() {
        let view = MonitorView::from_snapshot(snapshot_of(completed_run(8, RunConclusion::Failure), Vec::new()));
        assert!(render_text(&view).contains("❌ Workflow failed. Check the logs above for details."));
    }

    #[test]
    fn test_render_errored() {
        let view = MonitorView::Errored {
            panel: ErrorPanel::new(RunId(4), "GitHub API error (404): Not Found"),
        };
        let text = render_text(&view);
        assert!(text.starts_with("Error loading workflow run #4\nGitHub API error (404): Not Found\n"));
        assert!(text.contains("  - Insufficient permissions"));
        assert!(text.ends_with("Back to patcher: /\n"));
    }
}
