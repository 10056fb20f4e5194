//! Counters for the tracking pipeline

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters updated by the ingestion and forward tasks.
#[derive(Debug, Default)]
pub struct PipelineStats {
    samples_received: AtomicU64,
    published: AtomicU64,
    stale_rejected: AtomicU64,
    context_failures: AtomicU64,
    forwards_attempted: AtomicU64,
    forwards_failed: AtomicU64,
    forwards_dropped: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSnapshot {
    pub samples_received: u64,
    pub published: u64,
    pub stale_rejected: u64,
    pub context_failures: u64,
    pub forwards_attempted: u64,
    pub forwards_failed: u64,
    pub forwards_dropped: u64,
}

impl PipelineStats {
    pub(crate) fn record_sample(&self) {
        self.samples_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale(&self) {
        self.stale_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_context_failure(&self) {
        self.context_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forward(&self, ok: bool) {
        self.forwards_attempted.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.forwards_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_forward_dropped(&self) {
        self.forwards_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            samples_received: self.samples_received.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            stale_rejected: self.stale_rejected.load(Ordering::Relaxed),
            context_failures: self.context_failures.load(Ordering::Relaxed),
            forwards_attempted: self.forwards_attempted.load(Ordering::Relaxed),
            forwards_failed: self.forwards_failed.load(Ordering::Relaxed),
            forwards_dropped: self.forwards_dropped.load(Ordering::Relaxed),
        }
    }
}
