//! Jobs and steps of a workflow run.

use serde::{Deserialize, Serialize};

use super::ids::JobId;

/// One step of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// 1-based position within the job.
    pub number: u32,
    /// Step name from the workflow file.
    pub name: String,
    /// Current status.
    pub status: String,
    /// Outcome, set once the step finished.
    #[serde(default)]
    pub conclusion: Option<String>,
}

/// A job belonging to exactly one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowJob {
    /// Job identifier.
    pub id: JobId,
    /// Job name.
    #[serde(default)]
    pub name: String,
    /// Current status.
    pub status: String,
    /// Outcome, set once the job finished.
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowJob {
    /// Returns the step currently executing, if any.
    #[must_use]
    pub fn current_step(&self) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.status == "in_progress")
    }
}
