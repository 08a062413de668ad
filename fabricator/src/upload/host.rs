//! Anonymous public file host.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::sync::Arc;
use tracing::{debug, info};

use super::image::ImageFile;
use super::progress::{progress_chunks, ProgressReporter, SharedProgress};
use crate::config::UploadConfig;
use crate::errors::{FabricatorError, UploadError};

/// Something that turns a local image into a publicly fetchable URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Uploads `file`, reporting progress to `progress`, and returns the
    /// hosted URL.
    async fn upload(&self, file: &ImageFile, progress: SharedProgress) -> Result<String, UploadError>;
}

/// Multipart upload to a catbox-compatible endpoint.
///
/// One attempt per call. Hosted files are never deleted.
#[derive(Debug, Clone)]
pub struct AnonymousHost {
    client: Client,
    url: String,
    chunk_size: usize,
}

impl AnonymousHost {
    /// Creates a host client for the configured endpoint and relay.
    pub fn new(config: &UploadConfig, user_agent: &str) -> Result<Self, FabricatorError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(config.timeout())
            .build()
            .map_err(|e| FabricatorError::configuration(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            url: config.target_url(),
            chunk_size: config.chunk_size,
        })
    }

    /// The URL uploads are posted to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ImageHost for AnonymousHost {
    async fn upload(&self, file: &ImageFile, progress: SharedProgress) -> Result<String, UploadError> {
        let total = file.len();
        let reporter = Arc::new(ProgressReporter::new(progress, total));
        let body = Body::wrap_stream(progress_chunks(
            file.data().to_vec(),
            self.chunk_size,
            Arc::clone(&reporter),
        ));
        let part = Part::stream_with_length(body, total)
            .file_name(file.name().to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("reqtype", "fileupload")
            .part("fileToUpload", part);

        debug!(url = %self.url, name = %file.name(), bytes = total, "Uploading image");
        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status.as_u16(), status.canonical_reason(), &body));
        }

        let url = parse_hosted_url(&response.text().await?)?;
        reporter.finish();
        info!(url = %url, bytes = total, "Image uploaded");
        Ok(url)
    }
}

const SNIPPET_CHARS: usize = 120;

fn snippet(body: &str) -> String {
    body.trim().chars().take(SNIPPET_CHARS).collect()
}

/// The host answers with the file URL as plain text.
pub(crate) fn parse_hosted_url(body: &str) -> Result<String, UploadError> {
    let url = body.trim();
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(url.to_string())
    } else {
        Err(UploadError::InvalidResponse(snippet(url)))
    }
}

/// Status text followed by the start of whatever the host said.
pub(crate) fn rejection(status: u16, reason: Option<&str>, body: &str) -> UploadError {
    let reason = reason.unwrap_or("Unknown");
    let detail = snippet(body);
    if detail.is_empty() {
        UploadError::rejected(status, reason)
    } else {
        UploadError::rejected(status, format!("{reason}: {detail}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hosted_url() {
        assert_eq!(
            parse_hosted_url("https://files.catbox.moe/abc123.img\n").unwrap(),
            "https://files.catbox.moe/abc123.img"
        );
        assert!(matches!(
            parse_hosted_url("No file uploaded"),
            Err(UploadError::InvalidResponse(_))
        ));
        assert!(parse_hosted_url("").is_err());
    }

    #[test]
    fn test_rejection_includes_host_text() {
        let err = rejection(412, Some("Precondition Failed"), "File too large.\n");
        assert_eq!(err.to_string(), "Upload failed: 412 Precondition Failed: File too large.");

        let bare = rejection(502, Some("Bad Gateway"), "  ");
        assert_eq!(bare.to_string(), "Upload failed: 502 Bad Gateway");

        let long = rejection(500, None, &"x".repeat(500));
        match long {
            UploadError::Rejected { status, status_text } => {
                assert_eq!(status, 500);
                assert_eq!(status_text, format!("Unknown: {}", "x".repeat(120)));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_relay_prefix_applied() {
        let config = UploadConfig {
            relay: Some("https://relay.example/?".into()),
            ..UploadConfig::default()
        };
        let host = AnonymousHost::new(&config, "test-agent").unwrap();
        assert_eq!(host.url(), "https://relay.example/?https://catbox.moe/user/api.php");
    }
}
