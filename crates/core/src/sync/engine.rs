//! Offline-first sync engine.
//!
//! A pass walks every registered repository, pushes each dirty record to the
//! remote authority and clears the flag on acknowledgement of the exact
//! version that was pushed. Failures are
//! isolated per record: a rejected push keeps that record dirty and the pass
//! moves on. Passes never overlap; concurrent callers wait in arrival order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use shuttlelink_domain::constants::MAX_SYNC_ERROR_LEN;
use shuttlelink_domain::{FailedRecord, SyncConfig, SyncReport, SyncStatus, SyncableRecord};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use super::ports::{RemoteAuthority, SyncRecordRepository};

/// Pushes locally-dirty records to the backend.
pub struct SyncEngine {
    repositories: Vec<Arc<dyn SyncRecordRepository>>,
    remote: Arc<dyn RemoteAuthority>,
    push_timeout: Duration,
    pass_lock: Mutex<()>,
    status_tx: watch::Sender<SyncStatus>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteAuthority>, push_timeout: Duration) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::Idle);
        Self { repositories: Vec::new(), remote, push_timeout, pass_lock: Mutex::new(()), status_tx }
    }

    pub fn from_config(remote: Arc<dyn RemoteAuthority>, config: &SyncConfig) -> Self {
        Self::new(remote, Duration::from_secs(config.push_timeout_seconds))
    }

    /// Register the repository of one record kind.
    pub fn with_repository(mut self, repository: Arc<dyn SyncRecordRepository>) -> Self {
        self.repositories.push(repository);
        self
    }

    /// Run one sync pass and return its terminal status.
    ///
    /// The same status sequence (`Started`, then `Success` or `Error`) is
    /// published to [`subscribe_status`](Self::subscribe_status) receivers.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> SyncStatus {
        let _pass = self.pass_lock.lock().await;
        self.status_tx.send_replace(SyncStatus::Started);

        let started = Instant::now();
        let mut report = SyncReport::default();
        let mut enumeration_errors = Vec::new();

        for repository in &self.repositories {
            let kind = repository.kind();
            let records = match repository.get_unsynced().await {
                Ok(records) => records,
                Err(err) => {
                    error!(kind = %kind, error = %err, "Failed to enumerate dirty records");
                    enumeration_errors.push(format!("{kind}: {err}"));
                    continue;
                }
            };

            if records.is_empty() {
                debug!(kind = %kind, "No dirty records");
                continue;
            }

            info!(kind = %kind, count = records.len(), "Pushing dirty records");
            for record in &records {
                self.push_record(repository.as_ref(), record, &mut report).await;
            }
        }

        let status = if enumeration_errors.is_empty() {
            info!(
                attempted = report.attempted,
                synced = report.synced,
                failed = report.failed_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Sync pass finished"
            );
            SyncStatus::Success(report)
        } else {
            warn!(
                errors = enumeration_errors.len(),
                synced = report.synced,
                "Sync pass finished with errors"
            );
            SyncStatus::Error(truncate_reason(&enumeration_errors.join("; ")))
        };

        self.status_tx.send_replace(status.clone());
        status
    }

    /// Most recently published status.
    pub fn status(&self) -> SyncStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    async fn push_record(
        &self,
        repository: &dyn SyncRecordRepository,
        record: &SyncableRecord,
        report: &mut SyncReport,
    ) {
        report.attempted += 1;

        let outcome = match tokio::time::timeout(self.push_timeout, self.remote.push(record)).await
        {
            Ok(Ok(())) => repository
                .mark_synced(&record.id, record.updated_at)
                .await
                .map_err(|err| format!("acknowledged but not marked synced: {err}")),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!("push timed out after {:?}", self.push_timeout)),
        };

        match outcome {
            Ok(true) => {
                debug!(kind = %record.kind, id = %record.id, "Record synced");
                report.synced += 1;
            }
            Ok(false) => {
                debug!(kind = %record.kind, id = %record.id, "Record rewritten since it was read; stays dirty");
                report.superseded += 1;
            }
            Err(reason) => {
                warn!(kind = %record.kind, id = %record.id, reason = %reason, "Record push failed");
                report.failed.push(FailedRecord {
                    kind: record.kind,
                    id: record.id.clone(),
                    reason: truncate_reason(&reason),
                });
            }
        }
    }
}

fn truncate_reason(reason: &str) -> String {
    if reason.len() <= MAX_SYNC_ERROR_LEN {
        return reason.to_string();
    }
    let mut end = MAX_SYNC_ERROR_LEN;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &reason[..end])
}
