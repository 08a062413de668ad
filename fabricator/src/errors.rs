//! Error types for the fabricator client.
//!
//! The taxonomy mirrors the four failure classes a submission or monitor
//! session can hit: configuration, validation, remote API and network.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum combined length, in characters, of all dispatch inputs.
pub const MAX_DISPATCH_INPUT_CHARS: usize = 65_535;

/// The main error type for fabricator operations.
#[derive(Debug, Error)]
pub enum FabricatorError {
    /// Missing or unusable configuration (usually the credential).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// User input failed validation before any network call.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Combined dispatch inputs exceed the platform ceiling.
    #[error("{0}")]
    PayloadTooLarge(#[from] PayloadTooLargeError),

    /// The dispatched run never showed up in the run listing.
    #[error("Workflow run not found for {workflow}")]
    RunNotFound {
        /// Workflow definition file that was dispatched.
        workflow: String,
    },

    /// The CI platform answered with a non-success status.
    #[error("{0}")]
    Remote(#[from] RemoteApiError),

    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// Uploading the boot image failed.
    #[error("{0}")]
    Upload(#[from] UploadError),

    /// A response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`FabricatorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Fix the configuration; retrying will not help.
    Configuration,
    /// Fix the input and resubmit.
    Validation,
    /// The remote platform or file host refused the request.
    Remote,
    /// The request never reached the remote side.
    Network,
    /// Local file system failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Validation => write!(f, "validation"),
            Self::Remote => write!(f, "remote"),
            Self::Network => write!(f, "network"),
            Self::Io => write!(f, "io"),
        }
    }
}

impl FabricatorError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a validation error for a form field.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(field, message))
    }

    /// Returns the taxonomy class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Validation(_) | Self::PayloadTooLarge(_) => ErrorKind::Validation,
            Self::RunNotFound { .. } | Self::Remote(_) | Self::Serialization(_) => {
                ErrorKind::Remote
            }
            Self::Network(_) => ErrorKind::Network,
            Self::Upload(err) => match err {
                UploadError::Network(_) => ErrorKind::Network,
                UploadError::Io(_) => ErrorKind::Io,
                _ => ErrorKind::Remote,
            },
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns true if the error was raised before any network traffic.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Validation)
    }
}

impl From<reqwest::Error> for FabricatorError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Remote(RemoteApiError::new(status.as_u16(), err.to_string()));
        }
        if err.is_decode() {
            return Self::Serialization(err.to_string());
        }
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FabricatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Error raised when a submission field is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The offending field.
    pub field: String,
    /// Human-readable message, shown inline next to the form.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error raised when dispatch inputs exceed [`MAX_DISPATCH_INPUT_CHARS`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Workflow inputs are too large: {length} characters (limit {limit}). \
     Upload the image to a file host and pass its URL instead."
)]
pub struct PayloadTooLargeError {
    /// Combined character count of all non-empty inputs.
    pub length: usize,
    /// The ceiling that was exceeded.
    pub limit: usize,
}

impl PayloadTooLargeError {
    /// Creates a new payload error against the platform ceiling.
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self {
            length,
            limit: MAX_DISPATCH_INPUT_CHARS,
        }
    }
}

/// A non-success response from the CI platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("GitHub API error ({status}): {message}")]
pub struct RemoteApiError {
    /// HTTP status code.
    pub status: u16,
    /// Message reported by the platform, or the canonical status text.
    pub message: String,
}

impl RemoteApiError {
    /// Creates a new remote API error.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates a 404 error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// Returns true for 401/403, i.e. a bad or under-scoped token.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

/// Errors raised by an image host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The host answered with a non-success status.
    #[error("Upload failed: {status} {status_text}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Status text reported by the host.
        status_text: String,
    },

    /// The token is not allowed to create releases or assets.
    #[error(
        "Upload rejected ({status}): make sure the GitHub token has write access \
         (contents: write) to the repository"
    )]
    PermissionDenied {
        /// HTTP status code.
        status: u16,
    },

    /// The host answered 2xx but the body was not a usable URL.
    #[error("Upload host returned an invalid response: {0}")]
    InvalidResponse(String),

    /// Transport-level failure while uploading.
    #[error("Upload failed: {0}")]
    Network(String),

    /// The local image could not be read.
    #[error("Could not read image: {0}")]
    Io(String),
}

impl UploadError {
    /// Creates a rejection from a status code and its text.
    #[must_use]
    pub fn rejected(status: u16, status_text: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            status_text: status_text.into(),
        }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::rejected(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
            ),
            None => Self::Network(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_too_large_message() {
        let err = PayloadTooLargeError::new(70_000);
        assert_eq!(err.limit, MAX_DISPATCH_INPUT_CHARS);
        assert!(err.to_string().contains("70000"));
        assert!(err.to_string().contains("65535"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            FabricatorError::configuration("no token").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            FabricatorError::from(PayloadTooLargeError::new(1)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            FabricatorError::from(RemoteApiError::not_found("Not Found")).kind(),
            ErrorKind::Remote
        );
        assert_eq!(
            FabricatorError::Network("reset".into()).kind(),
            ErrorKind::Network
        );
        assert_eq!(
            FabricatorError::from(UploadError::Network("reset".into())).kind(),
            ErrorKind::Network
        );
    }

    #[test]
    fn test_is_local() {
        assert!(FabricatorError::validation("image_url", "Please provide an image URL").is_local());
        assert!(!FabricatorError::RunNotFound { workflow: "patch-kernelsu.yml".into() }.is_local());
    }

    #[test]
    fn test_remote_error_auth_failure() {
        assert!(RemoteApiError::new(401, "Bad credentials").is_auth_failure());
        assert!(RemoteApiError::new(403, "Resource not accessible").is_auth_failure());
        assert!(!RemoteApiError::not_found("Not Found").is_auth_failure());
    }

    #[test]
    fn test_upload_error_display() {
        let err = UploadError::rejected(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Upload failed: 502 Bad Gateway");

        let denied = UploadError::PermissionDenied { status: 403 };
        assert!(denied.to_string().contains("contents: write"));
    }
}
