//! Observability metrics for admission control.
//!
//! Provides counters about limiter behavior for monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking admission statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters, so one handle can be given to several
/// limiters to aggregate them.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Admissions granted without waiting
    admitted_immediately: AtomicU64,
    /// Admissions granted after waiting for a refill
    admitted_after_wait: AtomicU64,
    /// Waits abandoned because the signal fired
    cancelled: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                admitted_immediately: AtomicU64::new(0),
                admitted_after_wait: AtomicU64::new(0),
                cancelled: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_immediate(&self) {
        self.inner
            .admitted_immediately
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_after_wait(&self) {
        self.inner
            .admitted_after_wait
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.inner.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of admissions granted without waiting.
    pub fn admitted_immediately(&self) -> u64 {
        self.inner.admitted_immediately.load(Ordering::Relaxed)
    }

    /// Get the number of admissions granted after waiting.
    pub fn admitted_after_wait(&self) -> u64 {
        self.inner.admitted_after_wait.load(Ordering::Relaxed)
    }

    /// Get the number of cancelled waits.
    pub fn cancelled(&self) -> u64 {
        self.inner.cancelled.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted_immediately: self.admitted_immediately(),
            admitted_after_wait: self.admitted_after_wait(),
            cancelled: self.cancelled(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.admitted_immediately.store(0, Ordering::Relaxed);
        self.inner.admitted_after_wait.store(0, Ordering::Relaxed);
        self.inner.cancelled.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Admissions granted without waiting
    pub admitted_immediately: u64,
    /// Admissions granted after waiting for a refill
    pub admitted_after_wait: u64,
    /// Waits abandoned because the signal fired
    pub cancelled: u64,
}

impl MetricsSnapshot {
    /// Total admissions granted.
    pub fn admitted(&self) -> u64 {
        self.admitted_immediately
            .saturating_add(self.admitted_after_wait)
    }

    /// Total `wait` calls that finished, either way.
    pub fn total_waits(&self) -> u64 {
        self.admitted().saturating_add(self.cancelled)
    }

    /// Fraction of finished waits that were cancelled (0.0 to 1.0).
    ///
    /// Returns 0.0 if no waits have finished.
    pub fn cancellation_rate(&self) -> f64 {
        let total = self.total_waits();
        if total == 0 {
            0.0
        } else {
            self.cancelled as f64 / total as f64
        }
    }
}
