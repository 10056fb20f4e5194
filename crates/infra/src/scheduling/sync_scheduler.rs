//! Sync scheduler for periodic record reconciliation.
//!
//! Runs [`SyncEngine::sync`] on a fixed interval. Passes never overlap: the
//! next tick waits for the current pass, and a pass that outlives
//! `pass_timeout` is abandoned (records it did not reach stay dirty for the
//! next pass).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use shuttlelink_core::SyncEngine;
//! use shuttlelink_infra::observability::metrics::SyncMetrics;
//! use shuttlelink_infra::scheduling::{SyncScheduler, SyncSchedulerConfig};
//!
//! # async fn example(engine: Arc<SyncEngine>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut scheduler = SyncScheduler::new(
//!     engine,
//!     SyncSchedulerConfig { interval: Duration::from_secs(300), ..Default::default() },
//!     Arc::new(SyncMetrics::new()),
//! );
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use shuttlelink_core::SyncEngine;
use shuttlelink_domain::{SyncConfig, SyncStatus};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::observability::metrics::SyncMetrics;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for sync scheduler
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Time between pass starts
    pub interval: Duration,
    /// Upper bound on a single pass
    pub pass_timeout: Duration,
    /// How long `stop` waits for the loop before aborting it
    pub join_timeout: Duration,
    /// Run a pass immediately on start instead of after one interval
    pub run_on_start: bool,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            pass_timeout: Duration::from_secs(120),
            join_timeout: Duration::from_secs(5),
            run_on_start: true,
        }
    }
}

impl From<&SyncConfig> for SyncSchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self { interval: Duration::from_secs(config.interval_seconds.max(1)), ..Self::default() }
    }
}

/// Sync scheduler for periodic reconciliation passes
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    config: SyncSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
    metrics: Arc<SyncMetrics>,
}

impl SyncScheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        config: SyncSchedulerConfig,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            engine,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
            metrics,
        }
    }

    /// Start the scheduler
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self), fields(interval_secs = self.config.interval.as_secs()))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        // Fresh token so the scheduler can be restarted after stop
        self.cancellation_token = CancellationToken::new();

        let engine = Arc::clone(&self.engine);
        let metrics = Arc::clone(&self.metrics);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::sync_loop(engine, metrics, config, cancel).await;
        });
        *self.task_handle.lock().await = Some(handle);

        info!("sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler, waiting up to `join_timeout` for the loop to
    /// exit before aborting it.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running or the loop had to be
    /// aborted
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(mut handle) = self.task_handle.lock().await.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation_token.cancel();

        let join_timeout = self.config.join_timeout;
        match tokio::time::timeout(join_timeout, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) if err.is_cancelled() => {}
            Ok(Err(err)) => return Err(SchedulerError::TaskJoinFailed(err.to_string())),
            Err(_) => {
                warn!(timeout_ms = join_timeout.as_millis() as u64, "sync loop did not stop in time, aborting");
                handle.abort();
                return Err(SchedulerError::Timeout { millis: join_timeout.as_millis() as u64 });
            }
        }

        info!("sync scheduler stopped");
        Ok(())
    }

    /// Check if scheduler is running
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Run one pass now, outside the schedule. Queues behind a running pass.
    pub async fn run_now(&self) -> SyncStatus {
        run_pass(&self.engine, &self.metrics, self.config.pass_timeout).await
    }

    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    async fn sync_loop(
        engine: Arc<SyncEngine>,
        metrics: Arc<SyncMetrics>,
        config: SyncSchedulerConfig,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !config.run_on_start {
            // First tick of an interval completes immediately
            ticker.tick().await;
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("sync loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!("sync loop cancelled mid-pass");
                            break;
                        }
                        _ = run_pass(&engine, &metrics, config.pass_timeout) => {}
                    }
                }
            }
        }
    }
}

/// Run one sync pass bounded by `pass_timeout`, recording it in `metrics`.
pub async fn run_pass(engine: &SyncEngine, metrics: &SyncMetrics, pass_timeout: Duration) -> SyncStatus {
    let started = Instant::now();

    match tokio::time::timeout(pass_timeout, engine.sync()).await {
        Ok(status) => {
            match &status {
                SyncStatus::Success(report) if report.is_clean() => {
                    debug!(synced = report.synced, "sync pass completed");
                }
                SyncStatus::Success(report) => {
                    warn!(
                        synced = report.synced,
                        superseded = report.superseded,
                        failed = report.failed_count(),
                        "sync pass completed with leftovers"
                    );
                }
                SyncStatus::Error(reason) => error!(%reason, "sync pass failed"),
                SyncStatus::Idle | SyncStatus::Started => {}
            }
            metrics.record_pass(started.elapsed(), &status);
            status
        }
        Err(_) => {
            warn!(timeout_ms = pass_timeout.as_millis() as u64, "sync pass timed out");
            metrics.record_timeout();
            SyncStatus::Error(format!("sync pass timed out after {}ms", pass_timeout.as_millis()))
        }
    }
}

/// Ensure scheduler is stopped when dropped
impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use shuttlelink_core::{RemoteAuthority, SyncRecordRepository};
    use shuttlelink_domain::{RecordKind, Result, SyncableRecord};

    use super::*;
    use crate::database::{DbManager, SqliteSyncRecordRepository};

    #[derive(Default)]
    struct CountingRemote {
        pushes: AtomicUsize,
    }

    #[async_trait]
    impl RemoteAuthority for CountingRemote {
        async fn push(&self, _record: &SyncableRecord) -> Result<()> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn scheduler(interval: Duration) -> SyncScheduler {
        let engine = Arc::new(SyncEngine::new(
            Arc::new(CountingRemote::default()),
            Duration::from_secs(1),
        ));
        SyncScheduler::new(
            engine,
            SyncSchedulerConfig { interval, ..Default::default() },
            Arc::new(SyncMetrics::new()),
        )
    }

    #[tokio::test]
    async fn lifecycle_and_double_start() {
        let mut scheduler = scheduler(Duration::from_secs(60));
        assert!(!scheduler.is_running());

        scheduler.start().await.unwrap();
        assert!(scheduler.is_running());
        assert!(matches!(scheduler.start().await, Err(SchedulerError::AlreadyRunning)));

        scheduler.stop().await.unwrap();
        assert!(!scheduler.is_running());
        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));

        scheduler.start().await.unwrap();
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn runs_passes_on_interval() {
        let mut scheduler = scheduler(Duration::from_millis(10));
        scheduler.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        scheduler.stop().await.unwrap();

        assert!(scheduler.metrics().snapshot().passes >= 2);
    }

    #[tokio::test]
    async fn run_now_records_metrics() {
        let scheduler = scheduler(Duration::from_secs(60));

        let status = scheduler.run_now().await;

        assert!(matches!(status, SyncStatus::Success(_)));
        assert_eq!(scheduler.metrics().snapshot().passes, 1);
    }

    struct StalledRemote;

    #[async_trait]
    impl RemoteAuthority for StalledRemote {
        async fn push(&self, _record: &SyncableRecord) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn pass_over_deadline_counts_a_timeout() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(dir.path().join("sched.db"), 2).unwrap());
        db.run_migrations().unwrap();
        let stops = Arc::new(SqliteSyncRecordRepository::new(db, RecordKind::Stop));
        stops.save_local("s-1", serde_json::json!({ "name": "Gate" })).await.unwrap();
        let engine = SyncEngine::new(Arc::new(StalledRemote), Duration::from_secs(10))
            .with_repository(stops);
        let metrics = SyncMetrics::new();

        let status = run_pass(&engine, &metrics, Duration::from_millis(20)).await;

        assert!(matches!(status, SyncStatus::Error(reason) if reason.contains("timed out")));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.timeouts, 1);
        assert_eq!(snapshot.passes, 0);
    }
}
