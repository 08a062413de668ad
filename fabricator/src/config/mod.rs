//! Client configuration.
//!
//! A [`FabricatorConfig`] is resolved once at process start (defaults, then an
//! optional JSON file, then environment, then command-line overrides) and then
//! passed by reference into every constructor. Nothing reads the environment
//! after that point.

mod credentials;

pub use credentials::{Credential, CredentialFile};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{FabricatorError, ValidationError};

/// Environment variable holding the token, checked first.
pub const TOKEN_ENV: &str = "LKM_GITHUB_TOKEN";
/// Fallback environment variable holding the token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricatorConfig {
    /// Owner of the repository hosting the patch workflows.
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Repository hosting the patch workflows.
    #[serde(default = "default_repo")]
    pub repo: String,
    /// Git ref the workflows are dispatched on.
    #[serde(default = "default_git_ref")]
    pub git_ref: String,
    /// REST API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Release asset upload base URL.
    #[serde(default = "default_uploads_base_url")]
    pub uploads_base_url: String,
    /// Path prefix the views are served under.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Interval between monitor polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Wait between dispatch and run lookup, in milliseconds.
    #[serde(default = "default_dispatch_grace_ms")]
    pub dispatch_grace_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Image upload settings.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Bearer credential. Never serialized.
    #[serde(skip)]
    pub token: Option<Credential>,
}

fn default_owner() -> String {
    "daglaroglou".to_string()
}

fn default_repo() -> String {
    "LKM-Fabricator".to_string()
}

fn default_git_ref() -> String {
    "main".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_uploads_base_url() -> String {
    "https://uploads.github.com".to_string()
}

fn default_base_path() -> String {
    "/LKM-Fabricator".to_string()
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_dispatch_grace_ms() -> u64 {
    2_000
}

fn default_timeout() -> f64 {
    30.0
}

fn default_user_agent() -> String {
    concat!("lkm-fabricator/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FabricatorConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            repo: default_repo(),
            git_ref: default_git_ref(),
            api_base_url: default_api_base_url(),
            uploads_base_url: default_uploads_base_url(),
            base_path: default_base_path(),
            poll_interval_ms: default_poll_interval_ms(),
            dispatch_grace_ms: default_dispatch_grace_ms(),
            request_timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            upload: UploadConfig::default(),
            token: None,
        }
    }
}

impl FabricatorConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON configuration file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, FabricatorError> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Applies the process environment on top of this configuration.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Applies variables from `lookup` on top of this configuration.
    #[must_use]
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(TOKEN_ENV).or_else(|| non_empty(GITHUB_TOKEN_ENV)) {
            self.token = Some(Credential::new(token));
        }
        if let Some(owner) = non_empty("LKM_REPO_OWNER") {
            self.owner = owner;
        }
        if let Some(repo) = non_empty("LKM_REPO_NAME") {
            self.repo = repo;
        }
        if let Some(git_ref) = non_empty("LKM_GIT_REF") {
            self.git_ref = git_ref;
        }
        if let Some(base_path) = non_empty("LKM_BASE_PATH") {
            self.base_path = base_path;
        }
        if let Some(relay) = non_empty("LKM_UPLOAD_RELAY") {
            self.upload.relay = Some(relay);
        }
        if let Some(strategy) = non_empty("LKM_UPLOAD_STRATEGY") {
            match strategy.parse() {
                Ok(strategy) => self.upload.strategy = strategy,
                Err(err) => tracing::warn!(error = %err, "Ignoring LKM_UPLOAD_STRATEGY"),
            }
        }
        self
    }

    /// Sets the repository.
    #[must_use]
    pub fn with_repository(mut self, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        self.owner = owner.into();
        self.repo = repo.into();
        self
    }

    /// Sets the credential.
    #[must_use]
    pub fn with_token(mut self, token: Credential) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the dispatch grace period.
    #[must_use]
    pub fn with_dispatch_grace(mut self, grace: Duration) -> Self {
        self.dispatch_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the credential, or a configuration error if none was resolved.
    pub fn credential(&self) -> Result<&Credential, FabricatorError> {
        self.token.as_ref().ok_or_else(|| {
            FabricatorError::configuration(format!(
                "GitHub token not configured. Set {TOKEN_ENV} or store one with `token set`."
            ))
        })
    }

    /// Poll interval as Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Dispatch grace period as Duration.
    #[must_use]
    pub fn dispatch_grace(&self) -> Duration {
        Duration::from_millis(self.dispatch_grace_ms)
    }

    /// Request timeout as Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_seconds.max(0.0))
    }

    /// `owner/repo`.
    #[must_use]
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// How a local image file reaches the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadStrategy {
    /// Anonymous public file host.
    #[default]
    AnonymousHost,
    /// Asset of a temporary release on the target repository.
    Release,
    /// Base64 inside the dispatch inputs; falls back to `Release` when the
    /// encoded image does not fit.
    Inline,
}

impl fmt::Display for UploadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnonymousHost => write!(f, "anonymous-host"),
            Self::Release => write!(f, "release"),
            Self::Inline => write!(f, "inline"),
        }
    }
}

impl FromStr for UploadStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "anonymous-host" | "host" => Ok(Self::AnonymousHost),
            "release" => Ok(Self::Release),
            "inline" => Ok(Self::Inline),
            other => Err(ValidationError::new(
                "upload_strategy",
                format!("Unknown upload strategy: '{other}'"),
            )),
        }
    }
}

/// Image upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Anonymous host endpoint.
    #[serde(default = "default_upload_endpoint")]
    pub endpoint: String,
    /// Optional relay prefix prepended to the endpoint.
    #[serde(default)]
    pub relay: Option<String>,
    /// Body chunk size; progress is reported once per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Strategy for local files.
    #[serde(default)]
    pub strategy: UploadStrategy,
    /// Timeout for the whole upload, in seconds.
    #[serde(default = "default_upload_timeout")]
    pub timeout_seconds: f64,
}

fn default_upload_endpoint() -> String {
    "https://catbox.moe/user/api.php".to_string()
}

fn default_chunk_size() -> usize {
    256 * 1024
}

fn default_upload_timeout() -> f64 {
    600.0
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: default_upload_endpoint(),
            relay: None,
            chunk_size: default_chunk_size(),
            strategy: UploadStrategy::default(),
            timeout_seconds: default_upload_timeout(),
        }
    }
}

impl UploadConfig {
    /// Endpoint with the relay prefix applied.
    #[must_use]
    pub fn target_url(&self) -> String {
        match self.relay.as_deref().filter(|r| !r.is_empty()) {
            Some(relay) => format!("{relay}{}", self.endpoint),
            None => self.endpoint.clone(),
        }
    }

    /// Upload timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FabricatorConfig::default();
        assert_eq!(config.repository(), "daglaroglou/LKM-Fabricator");
        assert_eq!(config.git_ref, "main");
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.dispatch_grace(), Duration::from_secs(2));
        assert_eq!(config.upload.strategy, UploadStrategy::AnonymousHost);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_missing_credential_is_configuration_error() {
        let err = FabricatorConfig::default().credential().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Configuration);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GITHUB_TOKEN", "ghp_fallback"),
            ("LKM_REPO_OWNER", "someone"),
            ("LKM_BASE_PATH", "/"),
            ("LKM_REPO_NAME", "  "),
        ]
        .into_iter()
        .collect();
        let config = FabricatorConfig::default()
            .with_env_from(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.token.as_ref().map(Credential::expose), Some("ghp_fallback"));
        assert_eq!(config.owner, "someone");
        assert_eq!(config.repo, "LKM-Fabricator");
        assert_eq!(config.base_path, "/");
    }

    #[test]
    fn test_primary_token_wins() {
        let config = FabricatorConfig::default().with_env_from(|key| match key {
            TOKEN_ENV => Some("ghp_primary".to_string()),
            GITHUB_TOKEN_ENV => Some("ghp_fallback".to_string()),
            _ => None,
        });
        assert_eq!(config.token.as_ref().map(Credential::expose), Some("ghp_primary"));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"repo": "Fork", "poll_interval_ms": 500, "upload": {{"strategy": "release"}}}}"#
        )
        .unwrap();

        let config = FabricatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.repo, "Fork");
        assert_eq!(config.owner, "daglaroglou");
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.upload.strategy, UploadStrategy::Release);
        assert_eq!(config.upload.chunk_size, 256 * 1024);
    }

    #[test]
    fn test_token_never_serialized() {
        let config = FabricatorConfig::default().with_token(Credential::new("ghp_secret"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("ghp_secret"));
    }

    #[test]
    fn test_upload_target_url_with_relay() {
        let mut upload = UploadConfig::default();
        assert_eq!(upload.target_url(), "https://catbox.moe/user/api.php");
        upload.relay = Some("https://corsproxy.io/?".into());
        assert_eq!(upload.target_url(), "https://corsproxy.io/?https://catbox.moe/user/api.php");
    }

    #[test]
    fn test_upload_strategy_parse() {
        assert_eq!("inline".parse::<UploadStrategy>().unwrap(), UploadStrategy::Inline);
        assert_eq!("host".parse::<UploadStrategy>().unwrap(), UploadStrategy::AnonymousHost);
        assert!("ftp".parse::<UploadStrategy>().is_err());
    }
}
