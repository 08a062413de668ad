//! Submission flow: validate the form, get the image somewhere reachable,
//! dispatch, then hand over to the monitor route.

mod flow;
mod validate;

pub use flow::{Submission, SubmissionFlow, SubmissionObserver, SubmissionPhase};
pub use validate::{validate, MISSING_TOKEN_MESSAGE};
