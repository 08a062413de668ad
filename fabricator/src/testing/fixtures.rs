//! Canned platform objects for tests.

use chrono::{DateTime, Utc};

use crate::core::{
    Artifact, ArtifactId, JobId, RunConclusion, RunId, RunStatus, WorkflowJob, WorkflowRun,
    WorkflowStep,
};

/// 2024-05-01T10:00:00Z.
const FIXTURE_EPOCH: i64 = 1_714_557_600;

fn fixture_time(offset_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(FIXTURE_EPOCH + offset_secs, 0).unwrap_or_default()
}

/// A run with the given status and conclusion.
#[must_use]
pub fn sample_run(
    id: impl Into<RunId>,
    status: RunStatus,
    conclusion: Option<RunConclusion>,
) -> WorkflowRun {
    let id = id.into();
    WorkflowRun {
        id,
        status,
        conclusion,
        html_url: format!("https://github.com/daglaroglou/LKM-Fabricator/actions/runs/{id}"),
        created_at: fixture_time(0),
        updated_at: fixture_time(300),
    }
}

/// A run that is still executing.
#[must_use]
pub fn in_progress_run(id: impl Into<RunId>) -> WorkflowRun {
    sample_run(id, RunStatus::InProgress, None)
}

/// A finished run.
#[must_use]
pub fn completed_run(id: impl Into<RunId>, conclusion: RunConclusion) -> WorkflowRun {
    sample_run(id, RunStatus::Completed, Some(conclusion))
}

/// A job with two steps: a finished checkout and a running patch step.
#[must_use]
pub fn sample_job(id: impl Into<JobId>) -> WorkflowJob {
    WorkflowJob {
        id: id.into(),
        name: "patch".to_string(),
        status: "in_progress".to_string(),
        conclusion: None,
        steps: vec![
            WorkflowStep {
                number: 1,
                name: "Checkout".to_string(),
                status: "completed".to_string(),
                conclusion: Some("success".to_string()),
            },
            WorkflowStep {
                number: 2,
                name: "Patch boot image".to_string(),
                status: "in_progress".to_string(),
                conclusion: None,
            },
        ],
    }
}

/// An artifact of `size` bytes.
#[must_use]
pub fn sample_artifact(id: impl Into<ArtifactId>, name: &str, size: u64) -> Artifact {
    let id = id.into();
    Artifact {
        id,
        name: name.to_string(),
        size_in_bytes: size,
        archive_download_url: format!(
            "https://api.github.com/repos/daglaroglou/LKM-Fabricator/actions/artifacts/{id}/zip"
        ),
        created_at: fixture_time(600),
    }
}
