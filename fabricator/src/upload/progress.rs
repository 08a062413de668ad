//! Byte-level upload progress.

use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of an upload in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadProgress {
    /// Bytes handed to the transport so far.
    pub bytes_sent: u64,
    /// Size of the whole body.
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Completed fraction in `0.0..=1.0`. An empty body counts as done.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            (self.bytes_sent as f64 / self.total_bytes as f64).min(1.0)
        }
    }

    /// Completed percentage in `0.0..=100.0`.
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }

    /// Whether every byte was sent.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.bytes_sent >= self.total_bytes
    }
}

/// Receives progress reports.
pub trait ProgressSink: Send + Sync {
    /// Called with each new report.
    fn on_progress(&self, progress: UploadProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(UploadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: UploadProgress) {
        self(progress);
    }
}

/// Shared handle to a progress sink.
pub type SharedProgress = Arc<dyn ProgressSink>;

/// A sink that discards reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _progress: UploadProgress) {}
}

/// Returns a shared sink that discards reports.
#[must_use]
pub fn no_progress() -> SharedProgress {
    Arc::new(NoProgress)
}

/// Turns byte counts into reports that never go backwards and always end at
/// 100% once [`ProgressReporter::finish`] is called.
pub struct ProgressReporter {
    sink: SharedProgress,
    total: u64,
    sent: AtomicU64,
    last_reported: Mutex<Option<u64>>,
}

impl ProgressReporter {
    /// Creates a reporter for a body of `total` bytes.
    #[must_use]
    pub fn new(sink: SharedProgress, total: u64) -> Self {
        Self {
            sink,
            total,
            sent: AtomicU64::new(0),
            last_reported: Mutex::new(None),
        }
    }

    /// Records `bytes` more bytes and reports if the count moved.
    pub fn advance(&self, bytes: u64) {
        let sent = self.sent.fetch_add(bytes, Ordering::SeqCst).saturating_add(bytes);
        self.report(sent.min(self.total));
    }

    /// Reports 100% unless that was already the last report.
    pub fn finish(&self) {
        self.report(self.total);
    }

    /// Total body size.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    fn report(&self, bytes_sent: u64) {
        let mut last = self.last_reported.lock();
        if last.is_some_and(|prev| bytes_sent <= prev) {
            return;
        }
        *last = Some(bytes_sent);
        self.sink.on_progress(UploadProgress {
            bytes_sent,
            total_bytes: self.total,
        });
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("total", &self.total)
            .field("sent", &self.sent.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Splits `data` into a body stream that advances `reporter` as each chunk is
/// pulled by the HTTP client.
pub fn progress_chunks(
    data: Vec<u8>,
    chunk_size: usize,
    reporter: Arc<ProgressReporter>,
) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + Sync + 'static {
    let chunks: Vec<Vec<u8>> = data.chunks(chunk_size.max(1)).map(<[u8]>::to_vec).collect();
    futures::stream::iter(chunks.into_iter().map(move |chunk| {
        reporter.advance(chunk.len() as u64);
        Ok(chunk)
    }))
}
