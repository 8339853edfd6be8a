use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Tracks task throughput and concurrency for a worker pool
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    // Task lifecycle counters
    submitted: Arc<AtomicU64>,
    started: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
    aborted: Arc<AtomicU64>,
    timed_out: Arc<AtomicU64>,

    // Concurrency
    peak_running: Arc<AtomicU64>,
    peak_queued: Arc<AtomicU64>,

    // Id cache
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,
}

impl PoolMetrics {
    /// Creates a new PoolMetrics instance
    pub fn new() -> Self {
        Self {
            submitted: Arc::new(AtomicU64::new(0)),
            started: Arc::new(AtomicU64::new(0)),
            completed: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            rejected: Arc::new(AtomicU64::new(0)),
            aborted: Arc::new(AtomicU64::new(0)),
            timed_out: Arc::new(AtomicU64::new(0)),
            peak_running: Arc::new(AtomicU64::new(0)),
            peak_queued: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
        }
    }

    fn raise_peak(peak: &AtomicU64, value: u64) {
        let mut current = peak.load(Ordering::Relaxed);
        while value > current {
            match peak.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Records a task entering the queue, with the resulting queue length
    pub fn record_submitted(&self, queued: usize) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Self::raise_peak(&self.peak_queued, queued as u64);
    }

    /// Records a task starting, with the resulting number of running tasks
    pub fn record_started(&self, running: usize) {
        self.started.fetch_add(1, Ordering::Relaxed);
        Self::raise_peak(&self.peak_running, running as u64);
        debug!("Task started, {} running", running);
    }

    /// Records a task finishing, successfully or not
    pub fn record_finished(&self, success: bool) {
        if success {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records queued tasks rejected by a shutdown
    pub fn record_rejected(&self, count: usize) {
        self.rejected.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Records in-flight tasks aborted by a forced shutdown
    pub fn record_aborted(&self, count: usize) {
        self.aborted.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Records a task whose queue wait budget elapsed
    pub fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an id cache lookup
    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Gets a snapshot of the counters
    pub fn get_stats(&self) -> PoolStats {
        PoolStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            peak_running: self.peak_running.load(Ordering::Relaxed),
            peak_queued: self.peak_queued.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Pool stats:\n\
             Submitted/started: {}/{}\n\
             Completed/failed: {}/{}\n\
             Rejected/aborted/timed out: {}/{}/{}\n\
             Peak running/queued: {}/{}\n\
             Cache hits/misses: {}/{}",
            stats.submitted,
            stats.started,
            stats.completed,
            stats.failed,
            stats.rejected,
            stats.aborted,
            stats.timed_out,
            stats.peak_running,
            stats.peak_queued,
            stats.cache_hits,
            stats.cache_misses
        );
    }
}

impl Default for PoolMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: u64,
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub aborted: u64,
    pub timed_out: u64,
    pub peak_running: u64,
    pub peak_queued: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}
