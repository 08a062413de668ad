//! Getting a local boot image to somewhere the workflow can fetch it.
//!
//! Three routes exist, chosen by [`crate::config::UploadStrategy`]:
//! - [`AnonymousHost`]: multipart upload to a public file host
//! - [`ReleaseStaging`]: asset on a temporary pre-release of the repository
//! - inline: base64 in the dispatch inputs, for images small enough to fit

mod host;
mod image;
mod progress;
mod release;

pub use host::{AnonymousHost, ImageHost};
pub use image::{ImageFile, IMAGE_EXTENSION};
pub use progress::{
    no_progress, progress_chunks, NoProgress, ProgressReporter, ProgressSink, SharedProgress,
    UploadProgress,
};
pub use release::{ReleaseStaging, StagedUpload, STAGING_TAG_PREFIX};
