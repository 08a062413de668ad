//! Core data model: runs, jobs, artifacts, patchers and requests.

mod artifact;
mod ids;
mod job;
mod patcher;
mod request;
mod run;

pub use artifact::Artifact;
pub use ids::{ArtifactId, JobId, RunId};
pub use job::{WorkflowJob, WorkflowStep};
pub use patcher::{KmiVersion, PatcherVariant};
pub use request::{DispatchRequest, ImageSource, PatchForm, PatchRequest, SourceType};
pub use run::{RunConclusion, RunStatus, WorkflowRun};
