//! SQLite-backed implementation of the sync record repository port.
//!
//! One generic repository serves every record kind; the kind selects the
//! table. Timestamps are stored as microseconds since the epoch. Every write
//! moves `updated_at` strictly forward, so `mark_synced` can use it as the
//! record version and clear the flag only for the version that was pushed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use shuttlelink_core::SyncRecordRepository as SyncRecordRepositoryPort;
use shuttlelink_domain::{
    RecordKind, Result as DomainResult, ShuttleError, SyncEntity, SyncableRecord,
};
use tokio::task;

use super::manager::{map_sql_error, DbManager, SqliteConnection};

/// SQLite repository for one [`RecordKind`].
pub struct SqliteSyncRecordRepository {
    db: Arc<DbManager>,
    kind: RecordKind,
}

impl SqliteSyncRecordRepository {
    pub fn new(db: Arc<DbManager>, kind: RecordKind) -> Self {
        Self { db, kind }
    }

    /// One repository per record kind, sharing the same pool.
    pub fn for_all_kinds(db: &Arc<DbManager>) -> Vec<Arc<Self>> {
        RecordKind::ALL.iter().map(|kind| Arc::new(Self::new(Arc::clone(db), *kind))).collect()
    }

    /// Encode and save a typed entity.
    pub async fn save_entity<E: SyncEntity>(
        &self,
        id: &str,
        entity: &E,
    ) -> DomainResult<SyncableRecord> {
        if E::KIND != self.kind {
            return Err(ShuttleError::InvalidInput(format!(
                "cannot store {} in the {} repository",
                E::KIND,
                self.kind
            )));
        }
        let payload = serde_json::to_value(entity)?;
        SyncRecordRepositoryPort::save_local(self, id, payload).await
    }

    async fn run<T, F>(&self, op: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteConnection, RecordKind) -> DomainResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let kind = self.kind;

        task::spawn_blocking(move || -> DomainResult<T> {
            let conn = db.get_connection()?;
            op(&conn, kind)
        })
        .await
        .map_err(map_join_error)?
    }

    fn fetch_unsynced(conn: &SqliteConnection, kind: RecordKind) -> DomainResult<Vec<SyncableRecord>> {
        let sql = format!(
            "SELECT id, payload, needs_sync, last_synced_at, updated_at FROM {} \
             WHERE needs_sync = 1 ORDER BY updated_at, id",
            kind.table_name()
        );
        let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
        let rows = stmt.query_map([], |row| map_record_row(kind, row)).map_err(map_sql_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_sql_error)
    }

    fn fetch_one(
        conn: &SqliteConnection,
        kind: RecordKind,
        id: &str,
    ) -> DomainResult<Option<SyncableRecord>> {
        let sql = format!(
            "SELECT id, payload, needs_sync, last_synced_at, updated_at FROM {} WHERE id = ?1",
            kind.table_name()
        );
        conn.query_row(&sql, params![id], |row| map_record_row(kind, row))
            .optional()
            .map_err(map_sql_error)
    }

    fn upsert_dirty(
        conn: &SqliteConnection,
        kind: RecordKind,
        id: &str,
        payload: &serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let sql = format!(
            "INSERT INTO {table} (id, payload, needs_sync, last_synced_at, updated_at) \
             VALUES (?1, ?2, 1, NULL, ?3) \
             ON CONFLICT(id) DO UPDATE SET \
                 payload = excluded.payload, needs_sync = 1, \
                 updated_at = MAX(excluded.updated_at, {table}.updated_at + 1)",
            table = kind.table_name()
        );
        conn.execute(&sql, params![id, payload.to_string(), updated_at.timestamp_micros()])
            .map_err(map_sql_error)?;
        Ok(())
    }

    fn clear_flag(
        conn: &SqliteConnection,
        kind: RecordKind,
        id: &str,
        pushed_version: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let table = kind.table_name();
        let changed = conn
            .execute(
                &format!(
                    "UPDATE {table} SET needs_sync = 0, last_synced_at = MAX(?3, updated_at) \
                     WHERE id = ?1 AND updated_at = ?2"
                ),
                params![id, pushed_version.timestamp_micros(), Utc::now().timestamp_micros()],
            )
            .map_err(map_sql_error)?;
        if changed > 0 {
            return Ok(true);
        }

        let exists: bool = conn
            .query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
                params![id],
                |row| row.get(0),
            )
            .map_err(map_sql_error)?;
        if exists {
            Ok(false)
        } else {
            Err(ShuttleError::NotFound(format!("{kind} record {id}")))
        }
    }
}

#[async_trait]
impl SyncRecordRepositoryPort for SqliteSyncRecordRepository {
    fn kind(&self) -> RecordKind {
        self.kind
    }

    async fn get_unsynced(&self) -> DomainResult<Vec<SyncableRecord>> {
        self.run(Self::fetch_unsynced).await
    }

    async fn mark_synced(&self, id: &str, pushed_version: DateTime<Utc>) -> DomainResult<bool> {
        let id = id.to_string();
        self.run(move |conn, kind| Self::clear_flag(conn, kind, &id, pushed_version)).await
    }

    async fn save_local(
        &self,
        id: &str,
        payload: serde_json::Value,
    ) -> DomainResult<SyncableRecord> {
        let id = id.to_string();
        self.run(move |conn, kind| {
            Self::upsert_dirty(conn, kind, &id, &payload, Utc::now())?;
            Self::fetch_one(conn, kind, &id)?
                .ok_or_else(|| ShuttleError::Internal(format!("{kind} record {id} vanished after write")))
        })
        .await
    }

    async fn get(&self, id: &str) -> DomainResult<Option<SyncableRecord>> {
        let id = id.to_string();
        self.run(move |conn, kind| Self::fetch_one(conn, kind, &id)).await
    }
}

fn map_record_row(kind: RecordKind, row: &Row<'_>) -> rusqlite::Result<SyncableRecord> {
    let payload: String = row.get(1)?;
    let payload = serde_json::from_str(&payload)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(err)))?;
    let last_synced_at: Option<i64> = row.get(3)?;

    Ok(SyncableRecord {
        id: row.get(0)?,
        kind,
        payload,
        needs_sync: row.get(2)?,
        last_synced_at: last_synced_at.map(|micros| from_micros(3, micros)).transpose()?,
        updated_at: from_micros(4, row.get(4)?)?,
    })
}

fn from_micros(column: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Integer,
            "timestamp out of range".into(),
        )
    })
}

fn map_join_error(err: task::JoinError) -> ShuttleError {
    if err.is_cancelled() {
        ShuttleError::Internal("sync record task cancelled".into())
    } else {
        ShuttleError::Internal(format!("sync record task panic: {err}"))
    }
}
