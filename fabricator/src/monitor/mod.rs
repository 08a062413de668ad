//! Run monitor: polls one run on a fixed timer and renders each poll.
//!
//! A session ends on `completed`, on the first run or artifact fetch error,
//! or when its [`MonitorHandle`] is torn down or dropped. At most one fetch is
//! outstanding at a time.

mod poller;
mod render;
mod state;

pub use poller::{MonitorHandle, MonitorOutcome, RunMonitor};
pub use render::{classify_line, log_lines, render_text, LineClass, RunRenderer};
pub use state::{ErrorPanel, MonitorView, Placard, RunSnapshot, LIKELY_CAUSES};
