//! Workflow run status, conclusion and the run record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::RunId;

/// Lifecycle status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted, waiting for a runner.
    Queued,
    /// Executing.
    InProgress,
    /// Finished; the conclusion says how.
    Completed,
    /// Waiting on an environment protection rule.
    Waiting,
    /// Requested but not yet queued.
    Requested,
    /// Pending concurrency slot.
    Pending,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Queued
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Waiting => write!(f, "waiting"),
            Self::Requested => write!(f, "requested"),
            Self::Pending => write!(f, "pending"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl RunStatus {
    /// Returns true once the run can no longer change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Final outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    /// All jobs passed.
    Success,
    /// At least one job failed.
    Failure,
    /// The run was cancelled.
    Cancelled,
    /// Finished without a verdict.
    Neutral,
    /// Every job was skipped.
    Skipped,
    /// Exceeded the job time limit.
    TimedOut,
    /// Needs manual action.
    ActionRequired,
    /// Superseded.
    Stale,
    /// Any conclusion this client does not know about.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for RunConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Neutral => write!(f, "neutral"),
            Self::Skipped => write!(f, "skipped"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::ActionRequired => write!(f, "action_required"),
            Self::Stale => write!(f, "stale"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl RunConclusion {
    /// Returns true for conclusions that should have produced artifacts.
    #[must_use]
    pub fn is_success_like(&self) -> bool {
        matches!(self, Self::Success | Self::Neutral | Self::Skipped)
    }

    /// Returns true if the run failed. Conclusions this client does not
    /// know (such as `startup_failure`) count as failures.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failure | Self::TimedOut | Self::ActionRequired | Self::Unknown
        )
    }
}

/// One execution of a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Run identifier.
    pub id: RunId,
    /// Current status.
    pub status: RunStatus,
    /// Outcome, set once completed.
    #[serde(default)]
    pub conclusion: Option<RunConclusion>,
    /// Web page of the run.
    pub html_url: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    /// Returns true once the run reached `completed`.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    /// The badge text shown for the run: conclusion if any, else status.
    #[must_use]
    pub fn display_state(&self) -> String {
        self.conclusion
            .map_or_else(|| self.status.to_string(), |c| c.to_string())
    }
}
