//! Test doubles for the transport, image host, renderer and observer seams.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use super::fixtures::in_progress_run;
use crate::core::{Artifact, ArtifactId, RunId, WorkflowJob, WorkflowRun};
use crate::errors::{FabricatorError, RemoteApiError, UploadError};
use crate::github::{ActionsTransport, Release, ReleaseAsset, ReleaseDraft};
use crate::monitor::{MonitorView, RunRenderer};
use crate::submission::{SubmissionObserver, SubmissionPhase};
use crate::upload::{ImageFile, ImageHost, ProgressReporter, SharedProgress, UploadProgress};

/// One recorded `create_dispatch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDispatch {
    /// Workflow definition file.
    pub workflow_file: String,
    /// Git ref the run was requested on.
    pub git_ref: String,
    /// Inputs as sent.
    pub inputs: BTreeMap<String, String>,
}

type Reply<T> = Result<T, RemoteApiError>;

/// A scripted [`ActionsTransport`].
///
/// `get_run` replies are consumed in order; the last one repeats. Jobs and
/// artifacts replies are sticky until replaced. Any operation can be made to
/// fail once with [`MockTransport::fail_next`].
#[derive(Debug)]
pub struct MockTransport {
    latest_runs: Mutex<Vec<WorkflowRun>>,
    runs: Mutex<VecDeque<Reply<WorkflowRun>>>,
    jobs: Mutex<Reply<Vec<WorkflowJob>>>,
    artifacts: Mutex<Reply<Vec<Artifact>>>,
    artifact_bytes: Mutex<Vec<u8>>,
    failures: Mutex<HashMap<String, RemoteApiError>>,
    calls: Mutex<HashMap<String, usize>>,
    dispatches: Mutex<Vec<RecordedDispatch>>,
    release_drafts: Mutex<Vec<ReleaseDraft>>,
    latency: Mutex<Duration>,
    in_flight: Mutex<(usize, usize)>,
    next_release_id: Mutex<u64>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a transport whose newest run is run `1`, in progress.
    #[must_use]
    pub fn new() -> Self {
        Self {
            latest_runs: Mutex::new(vec![in_progress_run(1)]),
            runs: Mutex::new(VecDeque::new()),
            jobs: Mutex::new(Ok(Vec::new())),
            artifacts: Mutex::new(Ok(Vec::new())),
            artifact_bytes: Mutex::new(b"PK\x05\x06".to_vec()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            dispatches: Mutex::new(Vec::new()),
            release_drafts: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
            in_flight: Mutex::new((0, 0)),
            next_release_id: Mutex::new(100),
        }
    }

    /// Sets what `list_runs` returns.
    #[must_use]
    pub fn with_latest_runs(self, runs: Vec<WorkflowRun>) -> Self {
        *self.latest_runs.lock() = runs;
        self
    }

    /// Queues `get_run` replies.
    #[must_use]
    pub fn with_run_sequence(self, runs: impl IntoIterator<Item = WorkflowRun>) -> Self {
        self.runs.lock().extend(runs.into_iter().map(Ok));
        self
    }

    /// Queues one `get_run` reply.
    pub fn push_run(&self, run: WorkflowRun) {
        self.runs.lock().push_back(Ok(run));
    }

    /// Queues one failing `get_run` reply.
    pub fn push_run_error(&self, err: RemoteApiError) {
        self.runs.lock().push_back(Err(err));
    }

    /// Sets what `list_jobs` returns.
    pub fn set_jobs(&self, jobs: Vec<WorkflowJob>) {
        *self.jobs.lock() = Ok(jobs);
    }

    /// Makes every `list_jobs` call fail.
    pub fn fail_jobs(&self, err: RemoteApiError) {
        *self.jobs.lock() = Err(err);
    }

    /// Sets what `list_artifacts` returns.
    pub fn set_artifacts(&self, artifacts: Vec<Artifact>) {
        *self.artifacts.lock() = Ok(artifacts);
    }

    /// Makes every `list_artifacts` call fail.
    pub fn fail_artifacts(&self, err: RemoteApiError) {
        *self.artifacts.lock() = Err(err);
    }

    /// Sets the archive bytes `download_artifact` returns.
    pub fn set_artifact_bytes(&self, bytes: Vec<u8>) {
        *self.artifact_bytes.lock() = bytes;
    }

    /// Makes the next call of `operation` fail with `err`.
    pub fn fail_next(&self, operation: &str, err: RemoteApiError) {
        self.failures.lock().insert(operation.to_string(), err);
    }

    /// Delays every read call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Number of calls to `operation`.
    #[must_use]
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    /// Number of calls across all operations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Highest number of read calls that were outstanding at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.in_flight.lock().1
    }

    /// Recorded `create_dispatch` calls.
    #[must_use]
    pub fn dispatches(&self) -> Vec<RecordedDispatch> {
        self.dispatches.lock().clone()
    }

    /// Recorded `create_release` drafts.
    #[must_use]
    pub fn release_drafts(&self) -> Vec<ReleaseDraft> {
        self.release_drafts.lock().clone()
    }

    fn enter(&self, operation: &str) -> Result<(), FabricatorError> {
        *self.calls.lock().entry(operation.to_string()).or_insert(0) += 1;
        match self.failures.lock().remove(operation) {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    async fn simulate_latency(&self) {
        {
            let mut in_flight = self.in_flight.lock();
            in_flight.0 += 1;
            in_flight.1 = in_flight.1.max(in_flight.0);
        }
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.lock().0 -= 1;
    }
}

#[async_trait]
impl ActionsTransport for MockTransport {
    async fn create_dispatch(
        &self,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<(), FabricatorError> {
        self.enter("create_dispatch")?;
        self.dispatches.lock().push(RecordedDispatch {
            workflow_file: workflow_file.to_string(),
            git_ref: git_ref.to_string(),
            inputs: inputs.clone(),
        });
        Ok(())
    }

    async fn list_runs(
        &self,
        _workflow_file: &str,
        per_page: u8,
    ) -> Result<Vec<WorkflowRun>, FabricatorError> {
        self.enter("list_runs")?;
        Ok(self
            .latest_runs
            .lock()
            .iter()
            .take(usize::from(per_page))
            .cloned()
            .collect())
    }

    async fn get_run(&self, run_id: RunId) -> Result<WorkflowRun, FabricatorError> {
        self.enter("get_run")?;
        self.simulate_latency().await;
        let reply = {
            let mut runs = self.runs.lock();
            if runs.len() > 1 {
                runs.pop_front()
            } else {
                runs.front().cloned()
            }
        };
        match reply {
            Some(reply) => Ok(reply?),
            None => Err(RemoteApiError::not_found(format!("run {run_id} not found")).into()),
        }
    }

    async fn list_jobs(&self, _run_id: RunId) -> Result<Vec<WorkflowJob>, FabricatorError> {
        self.enter("list_jobs")?;
        self.simulate_latency().await;
        Ok(self.jobs.lock().clone()?)
    }

    async fn list_artifacts(&self, _run_id: RunId) -> Result<Vec<Artifact>, FabricatorError> {
        self.enter("list_artifacts")?;
        self.simulate_latency().await;
        Ok(self.artifacts.lock().clone()?)
    }

    async fn download_artifact(&self, _artifact_id: ArtifactId) -> Result<Vec<u8>, FabricatorError> {
        self.enter("download_artifact")?;
        Ok(self.artifact_bytes.lock().clone())
    }

    async fn create_release(&self, draft: &ReleaseDraft) -> Result<Release, FabricatorError> {
        self.enter("create_release")?;
        self.release_drafts.lock().push(draft.clone());
        let id = {
            let mut next = self.next_release_id.lock();
            *next += 1;
            *next
        };
        Ok(Release {
            id,
            tag_name: draft.tag_name.clone(),
            html_url: format!("https://github.com/daglaroglou/LKM-Fabricator/releases/tag/{}", draft.tag_name),
        })
    }

    async fn upload_release_asset(
        &self,
        release: &Release,
        file: &ImageFile,
        progress: SharedProgress,
    ) -> Result<ReleaseAsset, FabricatorError> {
        self.enter("upload_release_asset")?;
        let reporter = ProgressReporter::new(progress, file.len());
        reporter.finish();
        Ok(ReleaseAsset {
            id: release.id * 10,
            name: file.name().to_string(),
            browser_download_url: format!(
                "https://github.com/daglaroglou/LKM-Fabricator/releases/download/{}/{}",
                release.tag_name,
                file.name()
            ),
        })
    }

    async fn delete_release(&self, _release: &Release) -> Result<(), FabricatorError> {
        self.enter("delete_release")?;
        Ok(())
    }
}

/// An [`ImageHost`] that returns a fixed URL after reporting progress in
/// four even steps.
#[derive(Debug)]
pub struct StaticHost {
    url: String,
    failure: Option<UploadError>,
    uploads: Mutex<Vec<String>>,
}

impl StaticHost {
    /// A host that always answers with `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            failure: None,
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// A host that always fails with `err`.
    #[must_use]
    pub fn failing(err: UploadError) -> Self {
        Self {
            url: String::new(),
            failure: Some(err),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Names of the files uploaded so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl ImageHost for StaticHost {
    async fn upload(&self, file: &ImageFile, progress: SharedProgress) -> Result<String, UploadError> {
        self.uploads.lock().push(file.name().to_string());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let reporter = ProgressReporter::new(progress, file.len());
        let quarter = file.len() / 4;
        for _ in 0..4 {
            reporter.advance(quarter);
        }
        reporter.finish();
        Ok(self.url.clone())
    }
}

/// A [`RunRenderer`] that keeps every view it was handed.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    views: Mutex<Vec<MonitorView>>,
}

impl RecordingRenderer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Views rendered so far, oldest first.
    #[must_use]
    pub fn views(&self) -> Vec<MonitorView> {
        self.views.lock().clone()
    }

    /// Number of renders.
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.views.lock().len()
    }
}

impl RunRenderer for RecordingRenderer {
    fn render(&self, view: &MonitorView) {
        self.views.lock().push(view.clone());
    }
}

/// A [`SubmissionObserver`] that keeps every phase and progress report.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    phases: Mutex<Vec<SubmissionPhase>>,
    progress: Mutex<Vec<UploadProgress>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Phases seen so far.
    #[must_use]
    pub fn phases(&self) -> Vec<SubmissionPhase> {
        self.phases.lock().clone()
    }

    /// Upload progress reports seen so far.
    #[must_use]
    pub fn progress(&self) -> Vec<UploadProgress> {
        self.progress.lock().clone()
    }
}

impl SubmissionObserver for RecordingObserver {
    fn on_phase(&self, phase: &SubmissionPhase) {
        self.phases.lock().push(phase.clone());
    }

    fn on_progress(&self, progress: UploadProgress) {
        self.progress.lock().push(progress);
    }
}
