//! Sync pass metrics
//!
//! Counts scheduler-driven passes and what they did to the records they
//! touched.
//!
//! ## Design
//! - **SeqCst ordering** for the pair used by the average pass time
//! - **Relaxed** for independent counters
//! - **Microsecond storage**, reporting helpers convert to ms

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use shuttlelink_domain::SyncStatus;

use crate::observability::{MetricsError, MetricsResult};

#[derive(Debug, Default)]
pub struct SyncMetrics {
    passes: AtomicUsize,
    total_pass_time_micros: AtomicU64,
    last_pass_time_micros: AtomicU64,
    records_synced: AtomicUsize,
    records_superseded: AtomicUsize,
    records_failed: AtomicUsize,
    pass_errors: AtomicUsize,
    timeouts: AtomicUsize,
}

/// Point-in-time copy of [`SyncMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncMetricsSnapshot {
    pub passes: usize,
    pub records_synced: usize,
    pub records_superseded: usize,
    pub records_failed: usize,
    pub pass_errors: usize,
    pub timeouts: usize,
    pub last_pass_time_ms: u64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished pass and its outcome.
    pub fn record_pass(&self, duration: Duration, status: &SyncStatus) {
        let micros = duration.as_micros() as u64;
        self.total_pass_time_micros.fetch_add(micros, Ordering::SeqCst);
        self.passes.fetch_add(1, Ordering::SeqCst);
        self.last_pass_time_micros.store(micros, Ordering::Relaxed);

        match status {
            SyncStatus::Success(report) => {
                self.records_synced.fetch_add(report.synced, Ordering::Relaxed);
                self.records_superseded.fetch_add(report.superseded, Ordering::Relaxed);
                self.records_failed.fetch_add(report.failed_count(), Ordering::Relaxed);
            }
            SyncStatus::Error(_) => {
                self.pass_errors.fetch_add(1, Ordering::Relaxed);
            }
            SyncStatus::Idle | SyncStatus::Started => {}
        }
    }

    /// Record a pass abandoned because it ran past its deadline.
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Average pass duration in milliseconds. Errors before the first pass.
    pub fn avg_pass_time_ms(&self) -> MetricsResult<f64> {
        let total = self.total_pass_time_micros.load(Ordering::SeqCst);
        let count = self.passes.load(Ordering::SeqCst);
        if count == 0 {
            return Err(MetricsError::EmptyData { metric: "avg_pass_time" });
        }
        Ok((total as f64 / count as f64) / 1_000.0)
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            passes: self.passes.load(Ordering::SeqCst),
            records_synced: self.records_synced.load(Ordering::Relaxed),
            records_superseded: self.records_superseded.load(Ordering::Relaxed),
            records_failed: self.records_failed.load(Ordering::Relaxed),
            pass_errors: self.pass_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            last_pass_time_ms: self.last_pass_time_micros.load(Ordering::Relaxed) / 1_000,
        }
    }
}
