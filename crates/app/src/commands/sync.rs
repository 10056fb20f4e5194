//! Offline-first sync commands

use std::time::Instant;

use shuttlelink_core::SyncRecordRepository;
use shuttlelink_domain::{RecordKind, Result, SyncStatus, SyncableRecord};
use shuttlelink_infra::observability::metrics::SyncMetricsSnapshot;
use shuttlelink_infra::scheduling::{run_pass, SyncSchedulerConfig};
use tracing::info;

use crate::utils::logging::{error_label, log_command_execution};
use crate::AppContext;

/// Run a sync pass now. Queues behind a scheduled pass that is in flight.
pub async fn sync_now(ctx: &AppContext) -> Result<SyncStatus> {
    let command_name = "sync::sync_now";
    let start = Instant::now();

    info!(command = command_name, "Manual sync requested");

    let pass_timeout = SyncSchedulerConfig::from(&ctx.config.sync).pass_timeout;
    let status = run_pass(&ctx.sync_engine, &ctx.sync_metrics, pass_timeout).await;

    let failed = matches!(status, SyncStatus::Error(_));
    log_command_execution(command_name, start.elapsed(), !failed, failed.then_some("sync"));
    Ok(status)
}

pub fn sync_status(ctx: &AppContext) -> SyncStatus {
    ctx.sync_engine.status()
}

pub fn sync_metrics(ctx: &AppContext) -> SyncMetricsSnapshot {
    ctx.sync_metrics.snapshot()
}

/// Write a record locally and flag it for the next pass
pub async fn save_record(
    ctx: &AppContext,
    kind: RecordKind,
    id: &str,
    payload: serde_json::Value,
) -> Result<SyncableRecord> {
    let command_name = "sync::save_record";
    let start = Instant::now();

    info!(command = command_name, %kind, id, "Saving local record");

    let result = match ctx.repository(kind) {
        Ok(repository) => repository.save_local(id, payload).await,
        Err(err) => Err(err),
    };

    let error_type = result.as_ref().err().map(error_label);
    log_command_execution(command_name, start.elapsed(), result.is_ok(), error_type);
    result
}

pub async fn get_record(ctx: &AppContext, kind: RecordKind, id: &str) -> Result<Option<SyncableRecord>> {
    ctx.repository(kind)?.get(id).await
}

/// Records of `kind` still waiting for a push
pub async fn pending_records(ctx: &AppContext, kind: RecordKind) -> Result<Vec<SyncableRecord>> {
    ctx.repository(kind)?.get_unsynced().await
}
