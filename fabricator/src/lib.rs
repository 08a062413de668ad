//! # LKM Fabricator
//!
//! Client for the boot-image patching workflows of the LKM Fabricator
//! repository.
//!
//! The crate covers the whole round trip:
//!
//! - **Submission**: validate the user's choices and upload a local image
//! - **Dispatch**: trigger the patcher's GitHub Actions workflow and find its run
//! - **Monitoring**: poll run status, job steps and artifacts on a fixed timer
//! - **Artifacts**: download the patched images
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fabricator::prelude::*;
//!
//! let config = FabricatorConfig::new().with_env();
//! let transport = Arc::new(HttpActionsTransport::new(&config)?);
//! let client = Arc::new(WorkflowClient::new(transport, &config));
//!
//! let request = DispatchRequest::for_url(
//!     PatcherVariant::Kernelsu,
//!     "https://example.com/boot.img",
//!     Some(KmiVersion::Android14_6_1),
//! );
//! let run_id = client.dispatch(&request).await?;
//!
//! let outcome = RunMonitor::new(client, renderer, &config)
//!     .spawn(run_id)
//!     .finished()
//!     .await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod github;
pub mod monitor;
pub mod routes;
pub mod submission;
pub mod testing;
pub mod upload;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{
        Credential, CredentialFile, FabricatorConfig, UploadConfig, UploadStrategy,
    };
    pub use crate::core::{
        Artifact, ArtifactId, DispatchRequest, ImageSource, KmiVersion, PatchForm,
        PatchRequest, PatcherVariant, RunConclusion, RunId, RunStatus, SourceType,
        WorkflowJob, WorkflowRun,
    };
    pub use crate::errors::{ErrorKind, FabricatorError, UploadError};
    pub use crate::github::{ActionsTransport, HttpActionsTransport, LogReport, WorkflowClient};
    pub use crate::monitor::{MonitorHandle, MonitorOutcome, MonitorView, RunMonitor, RunRenderer};
    pub use crate::routes::{Navigator, Route};
    pub use crate::submission::{Submission, SubmissionFlow, SubmissionObserver, SubmissionPhase};
    pub use crate::upload::{AnonymousHost, ImageFile, ImageHost, UploadProgress};
}
