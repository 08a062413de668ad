//! The REST surface the client consumes, as a trait.
//!
//! [`super::HttpActionsTransport`] talks to GitHub; tests plug in
//! [`crate::testing::MockTransport`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{Artifact, ArtifactId, RunId, WorkflowJob, WorkflowRun};
use crate::errors::FabricatorError;
use crate::upload::{ImageFile, SharedProgress};

/// Request body for creating a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDraft {
    /// Tag to create.
    pub tag_name: String,
    /// Release title.
    pub name: String,
    /// Release notes.
    pub body: String,
    /// Create as a draft.
    pub draft: bool,
    /// Mark as pre-release.
    pub prerelease: bool,
}

/// A release as returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release identifier.
    pub id: u64,
    /// Tag name.
    pub tag_name: String,
    /// Web page of the release.
    #[serde(default)]
    pub html_url: String,
}

/// An uploaded release asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// Asset identifier.
    pub id: u64,
    /// File name.
    pub name: String,
    /// Public download URL.
    pub browser_download_url: String,
}

/// Authenticated calls against the CI platform.
#[async_trait]
pub trait ActionsTransport: Send + Sync {
    /// Triggers a `workflow_dispatch` event.
    async fn create_dispatch(
        &self,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<(), FabricatorError>;

    /// Lists the newest runs of a workflow, newest first.
    async fn list_runs(
        &self,
        workflow_file: &str,
        per_page: u8,
    ) -> Result<Vec<WorkflowRun>, FabricatorError>;

    /// Fetches one run.
    async fn get_run(&self, run_id: RunId) -> Result<WorkflowRun, FabricatorError>;

    /// Lists the jobs of a run.
    async fn list_jobs(&self, run_id: RunId) -> Result<Vec<WorkflowJob>, FabricatorError>;

    /// Lists the artifacts of a run.
    async fn list_artifacts(&self, run_id: RunId) -> Result<Vec<Artifact>, FabricatorError>;

    /// Downloads an artifact's zip archive.
    async fn download_artifact(&self, artifact_id: ArtifactId) -> Result<Vec<u8>, FabricatorError>;

    /// Creates a release.
    async fn create_release(&self, draft: &ReleaseDraft) -> Result<Release, FabricatorError>;

    /// Uploads a file as a release asset.
    async fn upload_release_asset(
        &self,
        release: &Release,
        file: &ImageFile,
        progress: SharedProgress,
    ) -> Result<ReleaseAsset, FabricatorError>;

    /// Deletes a release together with its tag.
    async fn delete_release(&self, release: &Release) -> Result<(), FabricatorError>;
}
