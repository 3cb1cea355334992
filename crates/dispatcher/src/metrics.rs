//! Worker pool and sink metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Probe counters of the worker pool
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Jobs taken from the job queue
    jobs_received: AtomicU64,
    /// Probes that reported statistics
    completed: AtomicU64,
    /// Construction or run failures
    failed: AtomicU64,
    /// Probes stopped by shutdown
    cancelled: AtomicU64,
    /// Probes currently running
    in_flight: AtomicUsize,
    /// Highest `in_flight` observed
    peak_in_flight: AtomicUsize,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_jobs_received(&self) {
        self.jobs_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// A probe started running
    pub fn probe_started(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    /// A probe stopped running, whatever the result
    pub fn probe_stopped(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            jobs_received: self.jobs_received.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
            peak_in_flight: self.peak_in_flight(),
        }
    }
}

/// Snapshot of pool metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolMetricsSnapshot {
    pub jobs_received: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

/// Metrics for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Events handled successfully
    handled_count: AtomicU64,
    /// Events the sink failed to handle
    failure_count: AtomicU64,
    /// Result events dropped due to full queue
    dropped_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn handled_count(&self) -> u64 {
        self.handled_count.load(Ordering::Relaxed)
    }

    pub fn inc_handled_count(&self) {
        self.handled_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> SinkMetricsSnapshot {
        SinkMetricsSnapshot {
            queue_len: self.queue_len(),
            handled_count: self.handled_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkMetricsSnapshot {
    pub queue_len: usize,
    pub handled_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
}
