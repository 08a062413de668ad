//! Display helpers shared by the renderers.

mod format;

pub use format::{format_bytes, format_timestamp};
