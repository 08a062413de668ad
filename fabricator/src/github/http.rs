//! reqwest implementation of [`ActionsTransport`].

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::transport::{ActionsTransport, Release, ReleaseAsset, ReleaseDraft};
use crate::config::{Credential, FabricatorConfig};
use crate::core::{Artifact, ArtifactId, RunId, WorkflowJob, WorkflowRun};
use crate::errors::{FabricatorError, RemoteApiError};
use crate::upload::{progress_chunks, ImageFile, ProgressReporter, SharedProgress};

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const JOBS_PER_PAGE: u8 = 100;

#[derive(Deserialize)]
struct RunsPage {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct JobsPage {
    jobs: Vec<WorkflowJob>,
}

#[derive(Deserialize)]
struct ArtifactsPage {
    artifacts: Vec<Artifact>,
}

#[derive(Serialize)]
struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: &'a BTreeMap<String, String>,
}

/// GitHub REST transport authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpActionsTransport {
    client: Client,
    credential: Credential,
    api_base_url: String,
    uploads_base_url: String,
    owner: String,
    repo: String,
    chunk_size: usize,
    upload_timeout: Duration,
}

impl HttpActionsTransport {
    /// Builds a transport from resolved configuration.
    ///
    /// Fails with a configuration error when no credential was resolved.
    pub fn new(config: &FabricatorConfig) -> Result<Self, FabricatorError> {
        let credential = config.credential()?.clone();
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| FabricatorError::configuration(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            credential,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            uploads_base_url: config.uploads_base_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            chunk_size: config.upload.chunk_size,
            upload_timeout: config.upload.timeout(),
        })
    }

    /// URL of a repository-scoped API path.
    #[must_use]
    pub fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base_url,
            self.owner,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    /// URL that receives asset uploads for a release.
    #[must_use]
    pub fn asset_upload_url(&self, release_id: u64) -> String {
        format!(
            "{}/repos/{}/{}/releases/{release_id}/assets",
            self.uploads_base_url, self.owner, self.repo
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(self.credential.expose())
            .header(ACCEPT, GITHUB_JSON)
            .header(API_VERSION_HEADER, API_VERSION)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, FabricatorError> {
        let response = builder.send().await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FabricatorError> {
        debug!(url = %url, "GET");
        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Passes 2xx responses through and turns everything else into a
/// [`RemoteApiError`].
async fn check_status(response: Response) -> Result<Response, FabricatorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteApiError::new(status.as_u16(), error_message(status, &body)).into())
}

/// Picks the platform's `message` field out of an error body, falling back to
/// the canonical status text.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string())
}

#[async_trait]
impl ActionsTransport for HttpActionsTransport {
    async fn create_dispatch(
        &self,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<(), FabricatorError> {
        let url = self.repo_url(&format!("actions/workflows/{workflow_file}/dispatches"));
        debug!(url = %url, git_ref = %git_ref, "POST dispatch");
        let body = DispatchBody { git_ref, inputs };
        self.send(self.request(Method::POST, &url).json(&body)).await?;
        Ok(())
    }

    async fn list_runs(
        &self,
        workflow_file: &str,
        per_page: u8,
    ) -> Result<Vec<WorkflowRun>, FabricatorError> {
        let url = self.repo_url(&format!(
            "actions/workflows/{workflow_file}/runs?per_page={per_page}"
        ));
        let page: RunsPage = self.get_json(&url).await?;
        Ok(page.workflow_runs)
    }

    async fn get_run(&self, run_id: RunId) -> Result<WorkflowRun, FabricatorError> {
        self.get_json(&self.repo_url(&format!("actions/runs/{run_id}"))).await
    }

    async fn list_jobs(&self, run_id: RunId) -> Result<Vec<WorkflowJob>, FabricatorError> {
        let url = self.repo_url(&format!("actions/runs/{run_id}/jobs?per_page={JOBS_PER_PAGE}"));
        let page: JobsPage = self.get_json(&url).await?;
        Ok(page.jobs)
    }

    async fn list_artifacts(&self, run_id: RunId) -> Result<Vec<Artifact>, FabricatorError> {
        let page: ArtifactsPage = self
            .get_json(&self.repo_url(&format!("actions/runs/{run_id}/artifacts")))
            .await?;
        Ok(page.artifacts)
    }

    async fn download_artifact(&self, artifact_id: ArtifactId) -> Result<Vec<u8>, FabricatorError> {
        let url = self.repo_url(&format!("actions/artifacts/{artifact_id}/zip"));
        debug!(url = %url, "GET artifact archive");
        let response = self.send(self.request(Method::GET, &url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn create_release(&self, draft: &ReleaseDraft) -> Result<Release, FabricatorError> {
        let url = self.repo_url("releases");
        debug!(url = %url, tag = %draft.tag_name, "POST release");
        let response = self.send(self.request(Method::POST, &url).json(draft)).await?;
        Ok(response.json::<Release>().await?)
    }

    async fn upload_release_asset(
        &self,
        release: &Release,
        file: &ImageFile,
        progress: SharedProgress,
    ) -> Result<ReleaseAsset, FabricatorError> {
        let url = self.asset_upload_url(release.id);
        let total = file.len();
        let reporter = Arc::new(ProgressReporter::new(progress, total));
        let body = Body::wrap_stream(progress_chunks(
            file.data().to_vec(),
            self.chunk_size,
            Arc::clone(&reporter),
        ));

        debug!(url = %url, name = %file.name(), bytes = total, "POST release asset");
        let builder = self
            .request(Method::POST, &url)
            .query(&[("name", file.name())])
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, total)
            .timeout(self.upload_timeout)
            .body(body);
        let response = self.send(builder).await?;
        let asset = response.json::<ReleaseAsset>().await?;
        reporter.finish();
        Ok(asset)
    }

    async fn delete_release(&self, release: &Release) -> Result<(), FabricatorError> {
        let url = self.repo_url(&format!("releases/{}", release.id));
        self.send(self.request(Method::DELETE, &url)).await?;

        let tag_url = self.repo_url(&format!("git/refs/tags/{}", release.tag_name));
        if let Err(err) = self.send(self.request(Method::DELETE, &tag_url)).await {
            warn!(tag = %release.tag_name, error = %err, "Release deleted but its tag was not");
        }
        Ok(())
    }
}
