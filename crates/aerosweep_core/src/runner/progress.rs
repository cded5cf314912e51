use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Progress tracking and cancellation for a run batch.
///
/// Clones share the same counters, so a caller can keep one handle to watch or
/// cancel the batch while the runner's workers hold another.
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// Finished cases, successful or not
    completed: Arc<AtomicUsize>,
    /// Finished cases that did not produce an output
    failed: Arc<AtomicUsize>,
    /// Cases in the batch
    total: Arc<AtomicUsize>,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
}

impl RunProgress {
    /// Create a new progress tracker
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Record one finished case
    pub fn record(&self, success: bool) {
        if !success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset the counters for a new batch. The cancellation flag is kept.
    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Request cancellation: running processes are killed, pending cases skipped
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Whether every case of the batch has finished
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.completed() >= self.total()
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new(0)
    }
}
