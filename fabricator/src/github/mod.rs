//! Remote workflow client.
//!
//! [`WorkflowClient`] holds the logic; [`ActionsTransport`] is the REST seam
//! with [`HttpActionsTransport`] as the production implementation.

mod client;
mod http;
mod logs;
mod transport;

pub use client::WorkflowClient;
pub use http::HttpActionsTransport;
pub use logs::{
    format_jobs, LogReport, LogState, EMPTY_PLACEHOLDER, ERROR_PLACEHOLDER, WAITING_PLACEHOLDER,
};
pub use transport::{ActionsTransport, Release, ReleaseAsset, ReleaseDraft};
