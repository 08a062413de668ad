//! From a filled-in form to a monitored run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::validate::validate;
use crate::config::{FabricatorConfig, UploadStrategy};
use crate::core::{DispatchRequest, ImageSource, PatchForm, PatchRequest, RunId};
use crate::errors::{FabricatorError, MAX_DISPATCH_INPUT_CHARS};
use crate::github::{ActionsTransport, WorkflowClient};
use crate::routes::{Navigator, Route};
use crate::upload::{ImageFile, ImageHost, ProgressSink, SharedProgress, StagedUpload, UploadProgress};

/// Where a submission currently is. Drives the submit control's label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SubmissionPhase {
    /// Uploading the image.
    Uploading {
        /// Human-readable upload target.
        destination: String,
    },
    /// Triggering the workflow.
    Dispatching,
    /// The run exists; navigation follows.
    Dispatched {
        /// New run.
        run_id: RunId,
    },
    /// The submission stopped; the control can be re-enabled.
    Failed {
        /// Message to show inline.
        message: String,
    },
}

impl SubmissionPhase {
    /// Label for the submit control.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Uploading { destination } => format!("Uploading to {destination}..."),
            Self::Dispatching => "Starting workflow...".to_string(),
            Self::Dispatched { run_id } => format!("Started run #{run_id}"),
            Self::Failed { .. } => "Start Patching →".to_string(),
        }
    }
}

/// Receives submission phases and upload progress.
pub trait SubmissionObserver: Send + Sync {
    /// Called on every phase change.
    fn on_phase(&self, phase: &SubmissionPhase);

    /// Called with upload progress.
    fn on_progress(&self, _progress: UploadProgress) {}
}

struct ObserverProgress(Arc<dyn SubmissionObserver>);

impl ProgressSink for ObserverProgress {
    fn on_progress(&self, progress: UploadProgress) {
        self.0.on_progress(progress);
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// The dispatched run.
    pub run_id: RunId,
    /// Route the navigator was sent to.
    pub route: Route,
    /// Hosted image URL, when the image went out by URL.
    pub image_url: Option<String>,
    /// Staging release to discard once the run is over.
    pub staged: Option<StagedUpload>,
}

/// Validates, uploads, dispatches and navigates.
pub struct SubmissionFlow<T: ActionsTransport> {
    client: Arc<WorkflowClient<T>>,
    host: Arc<dyn ImageHost>,
    strategy: UploadStrategy,
    host_name: String,
}

impl<T: ActionsTransport> SubmissionFlow<T> {
    /// Creates a flow using the configured upload strategy.
    #[must_use]
    pub fn new(
        client: Arc<WorkflowClient<T>>,
        host: Arc<dyn ImageHost>,
        config: &FabricatorConfig,
    ) -> Self {
        Self {
            client,
            host,
            strategy: config.upload.strategy,
            host_name: host_label(&config.upload.endpoint),
        }
    }

    /// Overrides the upload strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: UploadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Runs one submission.
    ///
    /// On success the navigator is sent to the run's monitor route. On
    /// failure the observer sees [`SubmissionPhase::Failed`] and the error is
    /// returned for inline display; nothing is navigated.
    pub async fn submit(
        &self,
        form: PatchForm,
        observer: Arc<dyn SubmissionObserver>,
        navigator: &dyn Navigator,
    ) -> Result<Submission, FabricatorError> {
        match self.run(form, &observer).await {
            Ok(submission) => {
                observer.on_phase(&SubmissionPhase::Dispatched {
                    run_id: submission.run_id,
                });
                navigator.navigate(&submission.route);
                Ok(submission)
            }
            Err(err) => {
                warn!(error = %err, kind = %err.kind(), "Submission failed");
                observer.on_phase(&SubmissionPhase::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        form: PatchForm,
        observer: &Arc<dyn SubmissionObserver>,
    ) -> Result<Submission, FabricatorError> {
        let request = validate(form)?;
        let progress: SharedProgress = Arc::new(ObserverProgress(Arc::clone(observer)));

        let (dispatch, staged) = match &request.source {
            ImageSource::Url(url) => (
                DispatchRequest::for_url(request.variant, url.clone(), request.kmi_version),
                None,
            ),
            ImageSource::File(path) => {
                let file = ImageFile::open(path).await?;
                self.prepare_file(&request, &file, observer.as_ref(), progress).await?
            }
        };

        observer.on_phase(&SubmissionPhase::Dispatching);
        let run_id = match self.client.dispatch(&dispatch).await {
            Ok(run_id) => run_id,
            Err(err) => {
                if let Some(staged) = &staged {
                    if let Err(cleanup) = self.client.discard_staged(staged).await {
                        warn!(error = %cleanup, "Could not discard staging release");
                    }
                }
                return Err(err);
            }
        };

        info!(run_id = %run_id, variant = %request.variant, "Submission dispatched");
        Ok(Submission {
            run_id,
            route: Route::monitor(run_id),
            image_url: dispatch.image_url,
            staged,
        })
    }

    async fn prepare_file(
        &self,
        request: &PatchRequest,
        file: &ImageFile,
        observer: &dyn SubmissionObserver,
        progress: SharedProgress,
    ) -> Result<(DispatchRequest, Option<StagedUpload>), FabricatorError> {
        match self.strategy {
            UploadStrategy::AnonymousHost => {
                observer.on_phase(&SubmissionPhase::Uploading {
                    destination: self.host_name.clone(),
                });
                let url = self.host.upload(file, progress).await?;
                Ok((
                    DispatchRequest::for_url(request.variant, url, request.kmi_version),
                    None,
                ))
            }
            UploadStrategy::Release => self.stage(request, file, observer, progress).await,
            UploadStrategy::Inline => {
                if file.base64_len() <= MAX_DISPATCH_INPUT_CHARS {
                    let inline = DispatchRequest::for_inline(
                        request.variant,
                        file.to_base64(),
                        request.kmi_version,
                    );
                    if inline.input_chars() <= MAX_DISPATCH_INPUT_CHARS {
                        return Ok((inline, None));
                    }
                }
                info!(
                    bytes = file.len(),
                    "Image too large to inline, staging it on a release instead"
                );
                self.stage(request, file, observer, progress).await
            }
        }
    }

    async fn stage(
        &self,
        request: &PatchRequest,
        file: &ImageFile,
        observer: &dyn SubmissionObserver,
        progress: SharedProgress,
    ) -> Result<(DispatchRequest, Option<StagedUpload>), FabricatorError> {
        observer.on_phase(&SubmissionPhase::Uploading {
            destination: "GitHub release".to_string(),
        });
        let staged = self.client.stage_file(file, progress).await?;
        Ok((
            DispatchRequest::for_url(request.variant, staged.url.clone(), request.kmi_version),
            Some(staged),
        ))
    }
}

impl<T: ActionsTransport> std::fmt::Debug for SubmissionFlow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionFlow")
            .field("strategy", &self.strategy)
            .field("host", &self.host_name)
            .finish_non_exhaustive()
    }
}

/// Host part of the upload endpoint, e.g. `catbox.moe`.
fn host_label(endpoint: &str) -> String {
    let without_scheme = endpoint.split_once("://").map_or(endpoint, |(_, rest)| rest);
    without_scheme
        .split('/')
        .next()
        .filter(|h| !h.is_empty())
        .unwrap_or("file host")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::core::{KmiVersion, PatcherVariant};
    use crate::errors::{RemoteApiError, UploadError};
    use crate::routes::MockNavigator;
    use crate::testing::{in_progress_run, MockTransport, RecordingObserver, StaticHost};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    const HOSTED: &str = "https://files.catbox.moe/abc123.img";

    struct Harness {
        transport: Arc<MockTransport>,
        host: Arc<StaticHost>,
        observer: Arc<RecordingObserver>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_host(StaticHost::new(HOSTED))
        }

        fn with_host(host: StaticHost) -> Self {
            Self {
                transport: Arc::new(MockTransport::new().with_latest_runs(vec![in_progress_run(555)])),
                host: Arc::new(host),
                observer: Arc::new(RecordingObserver::new()),
            }
        }

        fn flow(&self, strategy: UploadStrategy) -> SubmissionFlow<MockTransport> {
            let config = FabricatorConfig::default();
            let client = Arc::new(WorkflowClient::new(Arc::clone(&self.transport), &config));
            SubmissionFlow::new(client, Arc::clone(&self.host) as Arc<dyn ImageHost>, &config)
                .with_strategy(strategy)
        }

        fn observer(&self) -> Arc<dyn SubmissionObserver> {
            Arc::clone(&self.observer) as Arc<dyn SubmissionObserver>
        }
    }

    fn navigator_expecting(run_id: u64) -> MockNavigator {
        let mut navigator = MockNavigator::new();
        navigator
            .expect_navigate()
            .withf(move |route| *route == Route::monitor(RunId(run_id)))
            .times(1)
            .return_const(());
        navigator
    }

    fn navigator_never() -> MockNavigator {
        let mut navigator = MockNavigator::new();
        navigator.expect_navigate().times(0);
        navigator
    }

    fn write_image(dir: &Path, name: &str, size: usize) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, vec![0x41; size]).unwrap();
        path
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_submission_dispatches_and_navigates() {
        let h = Harness::new();
        let form = PatchForm::from_url("https://x/boot.img", PatcherVariant::Kernelsu)
            .with_kmi(KmiVersion::Android14_6_1)
            .with_credential(Credential::new("ghp_test"));

        let submission = h
            .flow(UploadStrategy::AnonymousHost)
            .submit(form, h.observer(), &navigator_expecting(555))
            .await
            .unwrap();

        assert_eq!(submission.run_id, RunId(555));
        assert_eq!(submission.route, Route::monitor(RunId(555)));
        let inputs = &h.transport.dispatches()[0].inputs;
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs["kmi_version"], "android14-6.1");
        assert!(h.host.uploads().is_empty());
        assert_eq!(
            h.observer.phases(),
            vec![SubmissionPhase::Dispatching, SubmissionPhase::Dispatched { run_id: RunId(555) }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_submission_uploads_then_dispatches_without_kmi() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "boot.img", 2 * 1024 * 1024);
        let h = Harness::new();
        let form = PatchForm::from_file(path, PatcherVariant::Magisk)
            .with_credential(Credential::new("ghp_test"));

        let submission = h
            .flow(UploadStrategy::AnonymousHost)
            .submit(form, h.observer(), &navigator_expecting(555))
            .await
            .unwrap();

        assert_eq!(submission.image_url.as_deref(), Some(HOSTED));
        assert_eq!(h.host.uploads(), vec!["boot.img".to_string()]);
        let dispatch = &h.transport.dispatches()[0];
        assert_eq!(dispatch.workflow_file, "patch-magisk.yml");
        assert_eq!(dispatch.inputs["image_url"], HOSTED);
        assert!(!dispatch.inputs.contains_key("kmi_version"));

        let progress = h.observer.progress();
        assert!(progress.windows(2).all(|w| w[0].bytes_sent <= w[1].bytes_sent));
        assert_eq!(progress.last().map(UploadProgress::percent), Some(100.0));
        assert_eq!(
            h.observer.phases()[0],
            SubmissionPhase::Uploading { destination: "catbox.moe".into() }
        );
    }

    #[tokio::test]
    async fn test_oversized_url_rejected_before_any_call() {
        let h = Harness::new();
        let url = format!("https://x/{}", "a".repeat(70_000));
        let form = PatchForm::from_url(url, PatcherVariant::Magisk)
            .with_credential(Credential::new("ghp_test"));

        let err = h
            .flow(UploadStrategy::AnonymousHost)
            .submit(form, h.observer(), &navigator_never())
            .await
            .unwrap_err();

        assert!(matches!(err, FabricatorError::PayloadTooLarge(_)));
        assert_eq!(h.transport.total_calls(), 0);
        assert!(matches!(
            h.observer.phases().last(),
            Some(SubmissionPhase::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_calls() {
        let h = Harness::new();
        let form = PatchForm::from_url("https://x/boot.img", PatcherVariant::Apatch)
            .with_credential(Credential::new("ghp_test"));

        let err = h
            .flow(UploadStrategy::AnonymousHost)
            .submit(form, h.observer(), &navigator_never())
            .await
            .unwrap_err();

        assert!(err.is_local());
        assert_eq!(h.transport.total_calls(), 0);
        assert_eq!(
            h.observer.phases(),
            vec![SubmissionPhase::Failed {
                message: "Please select a KMI version for APatch".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_upload_failure_is_returned_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "boot.img", 1024);
        let h = Harness::with_host(StaticHost::failing(UploadError::rejected(503, "Service Unavailable")));
        let form = PatchForm::from_file(path, PatcherVariant::Magisk)
            .with_credential(Credential::new("ghp_test"));

        let err = h
            .flow(UploadStrategy::AnonymousHost)
            .submit(form, h.observer(), &navigator_never())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Upload failed: 503 Service Unavailable");
        assert_eq!(h.transport.call_count("create_dispatch"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_inline_image_goes_in_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "boot.img", 3000);
        let h = Harness::new();
        let form = PatchForm::from_file(path, PatcherVariant::Magisk)
            .with_credential(Credential::new("ghp_test"));

        let submission = h
            .flow(UploadStrategy::Inline)
            .submit(form, h.observer(), &navigator_expecting(555))
            .await
            .unwrap();

        assert!(submission.staged.is_none());
        assert!(submission.image_url.is_none());
        let inputs = &h.transport.dispatches()[0].inputs;
        assert_eq!(inputs["image_base64"].len(), 4000);
        assert!(!inputs.contains_key("image_url"));
        assert_eq!(h.transport.call_count("create_release"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_inline_image_falls_back_to_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "boot.img", 2 * 1024 * 1024);
        let h = Harness::new();
        let form = PatchForm::from_file(path, PatcherVariant::Magisk)
            .with_credential(Credential::new("ghp_test"));

        let submission = h
            .flow(UploadStrategy::Inline)
            .submit(form, h.observer(), &navigator_expecting(555))
            .await
            .unwrap();

        let staged = submission.staged.expect("staged release");
        assert_eq!(submission.image_url.as_deref(), Some(staged.url.as_str()));
        assert!(!h.transport.dispatches()[0].inputs.contains_key("image_base64"));
        assert_eq!(h.transport.call_count("upload_release_asset"), 1);
    }

    #[tokio::test]
    async fn test_failed_dispatch_discards_staged_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "boot.img", 4096);
        let h = Harness::new();
        h.transport.fail_next("create_dispatch", RemoteApiError::new(422, "Unexpected inputs provided"));
        let form = PatchForm::from_file(path, PatcherVariant::Magisk)
            .with_credential(Credential::new("ghp_test"));

        let err = h
            .flow(UploadStrategy::Release)
            .submit(form, h.observer(), &navigator_never())
            .await
            .unwrap_err();

        assert!(matches!(err, FabricatorError::Remote(ref e) if e.status == 422));
        assert_eq!(h.transport.call_count("delete_release"), 1);
    }

    #[test]
    fn test_host_label() {
        assert_eq!(host_label("https://catbox.moe/user/api.php"), "catbox.moe");
        assert_eq!(host_label("catbox.moe/user/api.php"), "catbox.moe");
        assert_eq!(host_label(""), "file host");
    }
}
