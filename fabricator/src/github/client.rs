//! Stateless operations against the patch workflows.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::logs::LogReport;
use super::transport::ActionsTransport;
use crate::config::FabricatorConfig;
use crate::core::{Artifact, ArtifactId, DispatchRequest, RunId, WorkflowJob, WorkflowRun};
use crate::errors::{FabricatorError, PayloadTooLargeError, MAX_DISPATCH_INPUT_CHARS};
use crate::upload::{ImageFile, ReleaseStaging, SharedProgress, StagedUpload};

/// Dispatches patch runs and reads their state.
///
/// Holds no per-run state; every call goes to the transport.
pub struct WorkflowClient<T: ActionsTransport> {
    transport: Arc<T>,
    git_ref: String,
    dispatch_grace: Duration,
}

impl<T: ActionsTransport> WorkflowClient<T> {
    /// Creates a client over `transport` using the ref and grace period from
    /// `config`.
    #[must_use]
    pub fn new(transport: Arc<T>, config: &FabricatorConfig) -> Self {
        Self {
            transport,
            git_ref: config.git_ref.clone(),
            dispatch_grace: config.dispatch_grace(),
        }
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Triggers the variant's workflow and returns the id of the newest run.
    ///
    /// The platform does not return the run id, so after dispatching this
    /// waits the grace period and takes the most recent run of the workflow.
    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<RunId, FabricatorError> {
        let workflow = request.variant.workflow_file();
        let length = request.input_chars();
        if length > MAX_DISPATCH_INPUT_CHARS {
            warn!(workflow = %workflow, length, "Dispatch inputs exceed the platform limit");
            return Err(PayloadTooLargeError::new(length).into());
        }

        let inputs = request.inputs();
        info!(
            workflow = %workflow,
            git_ref = %self.git_ref,
            inputs = ?inputs.keys().collect::<Vec<_>>(),
            "Dispatching workflow"
        );
        self.transport
            .create_dispatch(workflow, &self.git_ref, &inputs)
            .await?;

        tokio::time::sleep(self.dispatch_grace).await;

        let run = self
            .transport
            .list_runs(workflow, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FabricatorError::RunNotFound {
                workflow: workflow.to_string(),
            })?;
        info!(workflow = %workflow, run_id = %run.id, "Workflow run started");
        Ok(run.id)
    }

    /// Fetches one run.
    pub async fn get_run(&self, run_id: RunId) -> Result<WorkflowRun, FabricatorError> {
        self.transport.get_run(run_id).await
    }

    /// Fetches the jobs of a run.
    pub async fn get_jobs(&self, run_id: RunId) -> Result<Vec<WorkflowJob>, FabricatorError> {
        self.transport.list_jobs(run_id).await
    }

    /// Summarizes the jobs of a run. Never fails; a failed fetch yields an
    /// [`LogReport::unavailable`] report.
    pub async fn fetch_logs(&self, run_id: RunId) -> LogReport {
        match self.transport.list_jobs(run_id).await {
            Ok(jobs) => LogReport::from_jobs(&jobs),
            Err(err) => {
                debug!(run_id = %run_id, error = %err, "Could not fetch jobs");
                LogReport::unavailable(err.to_string())
            }
        }
    }

    /// Text of [`Self::fetch_logs`].
    pub async fn get_logs(&self, run_id: RunId) -> String {
        self.fetch_logs(run_id).await.text
    }

    /// Lists the artifacts of a run.
    pub async fn get_artifacts(&self, run_id: RunId) -> Result<Vec<Artifact>, FabricatorError> {
        self.transport.list_artifacts(run_id).await
    }

    /// Downloads an artifact's zip archive.
    pub async fn download_artifact(&self, artifact_id: ArtifactId) -> Result<Vec<u8>, FabricatorError> {
        let bytes = self.transport.download_artifact(artifact_id).await?;
        info!(artifact_id = %artifact_id, bytes = bytes.len(), "Downloaded artifact");
        Ok(bytes)
    }

    /// Stages a local image on a temporary pre-release.
    pub async fn stage_file(
        &self,
        file: &ImageFile,
        progress: SharedProgress,
    ) -> Result<StagedUpload, FabricatorError> {
        self.staging().stage(file, progress).await
    }

    /// Deletes a release created by [`Self::stage_file`].
    pub async fn discard_staged(&self, staged: &StagedUpload) -> Result<(), FabricatorError> {
        self.staging().discard(staged).await
    }

    fn staging(&self) -> ReleaseStaging<T> {
        ReleaseStaging::new(Arc::clone(&self.transport))
    }
}

impl<T: ActionsTransport> std::fmt::Debug for WorkflowClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowClient")
            .field("git_ref", &self.git_ref)
            .field("dispatch_grace", &self.dispatch_grace)
            .finish_non_exhaustive()
    }
}
