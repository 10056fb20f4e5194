//! Port interfaces for sync operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shuttlelink_domain::{RecordKind, Result, SyncableRecord};

/// Durable local store of one record kind with a dirty flag per record.
#[async_trait]
pub trait SyncRecordRepository: Send + Sync {
    /// Record kind this repository holds
    fn kind(&self) -> RecordKind;

    /// All records whose local changes have not reached the backend
    async fn get_unsynced(&self) -> Result<Vec<SyncableRecord>>;

    /// Clear the dirty flag of `id` if its stored version is still
    /// `pushed_version`, the `updated_at` of the record that was pushed.
    /// `last_synced_at` is set to the acknowledgement time.
    ///
    /// Returns `false` when the record was rewritten after it was read for
    /// the pass; it stays dirty so the newer payload goes out next time.
    async fn mark_synced(&self, id: &str, pushed_version: DateTime<Utc>) -> Result<bool>;

    /// Write a local change and flag it for sync. Every write moves
    /// `updated_at` strictly forward so it can serve as the record version.
    async fn save_local(&self, id: &str, payload: serde_json::Value) -> Result<SyncableRecord>;

    /// Look up a record by id
    async fn get(&self, id: &str) -> Result<Option<SyncableRecord>>;
}

/// Backend that accepts or rejects pushed records.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Push one record. `Ok` means the backend acknowledged it.
    async fn push(&self, record: &SyncableRecord) -> Result<()>;
}
