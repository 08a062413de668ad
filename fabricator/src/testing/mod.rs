//! Testing utilities.
//!
//! This module provides:
//! - A scripted transport standing in for the GitHub REST API
//! - Recording doubles for the image host, renderer and submission observer
//! - Canned runs, jobs and artifacts

mod fixtures;
mod mocks;

pub use fixtures::{completed_run, in_progress_run, sample_artifact, sample_job, sample_run};
pub use mocks::{MockTransport, RecordedDispatch, RecordingObserver, RecordingRenderer, StaticHost};
