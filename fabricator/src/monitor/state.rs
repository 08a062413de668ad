//! What the monitor view shows at each point of a session.

use serde::{Deserialize, Serialize};

use crate::core::{Artifact, RunId, WorkflowRun};
use crate::github::LogReport;
use crate::routes::Route;

/// Likely reasons a run could not be loaded.
pub const LIKELY_CAUSES: [&str; 3] = [
    "Invalid or expired GitHub token",
    "Workflow doesn't exist",
    "Insufficient permissions",
];

/// Everything fetched in one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Monitored run.
    pub run_id: RunId,
    /// Latest run state.
    pub run: WorkflowRun,
    /// Job and step summary.
    pub logs: LogReport,
    /// Artifacts uploaded so far.
    pub artifacts: Vec<Artifact>,
}

/// Notice shown in place of the artifact list of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placard {
    /// The run failed and produced nothing.
    Failure,
    /// The run was cancelled or went stale before producing anything.
    Stopped,
    /// The run finished without producing artifacts.
    NoArtifacts,
}

impl Placard {
    /// Placard for a finished run, if its artifact list is empty.
    #[must_use]
    pub fn for_run(run: &WorkflowRun, artifacts: &[Artifact]) -> Option<Self> {
        if !artifacts.is_empty() {
            return None;
        }
        match run.conclusion {
            None => Some(Self::NoArtifacts),
            Some(conclusion) if conclusion.is_success_like() => Some(Self::NoArtifacts),
            Some(conclusion) if conclusion.is_failure() => Some(Self::Failure),
            Some(_) => Some(Self::Stopped),
        }
    }

    /// Icon shown before the message.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Failure => "❌",
            Self::Stopped => "⏹️",
            Self::NoArtifacts => "⏳",
        }
    }

    /// Message text.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Failure => "Workflow failed. Check the logs above for details.",
            Self::Stopped => "Workflow was stopped before producing artifacts.",
            Self::NoArtifacts => "No artifacts available yet.",
        }
    }
}

/// Shown when the run or its artifacts could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPanel {
    /// Run that failed to load.
    pub run_id: RunId,
    /// Error message.
    pub message: String,
    /// Likely causes to list.
    pub causes: Vec<String>,
    /// Where the "back" action leads.
    pub back: Route,
}

impl ErrorPanel {
    /// Builds a panel for `run_id` listing [`LIKELY_CAUSES`].
    #[must_use]
    pub fn new(run_id: RunId, message: impl Into<String>) -> Self {
        Self {
            run_id,
            message: message.into(),
            causes: LIKELY_CAUSES.iter().map(ToString::to_string).collect(),
            back: Route::Submit,
        }
    }
}

/// One rendering of the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonitorView {
    /// Run still going; polling continues.
    Polling {
        /// Latest poll.
        snapshot: RunSnapshot,
    },
    /// Run reached `completed`; polling stopped.
    Complete {
        /// Final poll.
        snapshot: RunSnapshot,
        /// Notice when no artifacts were produced.
        placard: Option<Placard>,
    },
    /// A fetch failed; polling stopped.
    Errored {
        /// Error details.
        panel: ErrorPanel,
    },
}

impl MonitorView {
    /// View for a freshly fetched snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: RunSnapshot) -> Self {
        if snapshot.run.is_completed() {
            let placard = Placard::for_run(&snapshot.run, &snapshot.artifacts);
            Self::Complete { snapshot, placard }
        } else {
            Self::Polling { snapshot }
        }
    }

    /// True for views after which polling stops.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Polling { .. })
    }

    /// The snapshot, unless errored.
    #[must_use]
    pub fn snapshot(&self) -> Option<&RunSnapshot> {
        match self {
            Self::Polling { snapshot } | Self::Complete { snapshot, .. } => Some(snapshot),
            Self::Errored { .. } => None,
        }
    }
}
