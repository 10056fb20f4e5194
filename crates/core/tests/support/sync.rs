//! Fakes for the sync ports.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shuttlelink_core::{RemoteAuthority, SyncRecordRepository};
use shuttlelink_domain::{RecordKind, Result, ShuttleError, SyncableRecord};

/// In-memory repository with the same flag semantics as the SQLite one.
pub struct InMemoryRepository {
    kind: RecordKind,
    records: Mutex<BTreeMap<String, SyncableRecord>>,
    pub fail_enumeration: AtomicBool,
}

impl InMemoryRepository {
    pub fn new(kind: RecordKind) -> Self {
        Self { kind, records: Mutex::new(BTreeMap::new()), fail_enumeration: AtomicBool::new(false) }
    }

    pub fn snapshot(&self, id: &str) -> Option<SyncableRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn dirty_ids(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.needs_sync)
            .map(|record| record.id.clone())
            .collect()
    }
}

#[async_trait]
impl SyncRecordRepository for InMemoryRepository {
    fn kind(&self) -> RecordKind {
        self.kind
    }

    async fn get_unsynced(&self) -> Result<Vec<SyncableRecord>> {
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(ShuttleError::Database("disk I/O error".into()));
        }
        Ok(self.records.lock().unwrap().values().filter(|r| r.needs_sync).cloned().collect())
    }

    async fn mark_synced(&self, id: &str, pushed_version: DateTime<Utc>) -> Result<bool> {
        let mut records = self.records.lock().unwrap();
        let record =
            records.get_mut(id).ok_or_else(|| ShuttleError::NotFound(format!("record {id}")))?;
        if record.updated_at != pushed_version {
            return Ok(false);
        }
        record.needs_sync = false;
        record.last_synced_at = Some(Utc::now().max(record.updated_at));
        Ok(true)
    }

    async fn save_local(&self, id: &str, payload: serde_json::Value) -> Result<SyncableRecord> {
        let mut records = self.records.lock().unwrap();
        let previous = records.get(id);
        let updated_at = match previous {
            Some(prev) => Utc::now().max(prev.updated_at + chrono::Duration::microseconds(1)),
            None => Utc::now(),
        };
        let last_synced_at = previous.and_then(|r| r.last_synced_at);
        let mut record = SyncableRecord::dirty(id, self.kind, payload, updated_at);
        record.last_synced_at = last_synced_at;
        records.insert(id.to_string(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<SyncableRecord>> {
        Ok(self.snapshot(id))
    }
}

/// Remote authority that rejects a configurable set of ids.
#[derive(Default)]
pub struct ScriptedRemote {
    rejected: Mutex<HashSet<String>>,
    pushed: Mutex<Vec<String>>,
    pub delay_ms: AtomicU64,
}

impl ScriptedRemote {
    pub fn reject(&self, id: &str) {
        self.rejected.lock().unwrap().insert(id.to_string());
    }

    pub fn accept(&self, id: &str) {
        self.rejected.lock().unwrap().remove(id);
    }

    pub fn pushed(&self) -> Vec<String> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteAuthority for ScriptedRemote {
    async fn push(&self, record: &SyncableRecord) -> Result<()> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.pushed.lock().unwrap().push(record.id.clone());
        if self.rejected.lock().unwrap().contains(&record.id) {
            return Err(ShuttleError::Remote(format!("422 rejected {}", record.id)));
        }
        Ok(())
    }
}

/// Remote that records every pushed payload and, on the first push of
/// `trigger`, rewrites `target` locally.
pub struct CrossWritingRemote {
    pub repository: Arc<InMemoryRepository>,
    pub trigger: String,
    pub target: String,
    fired: AtomicBool,
    received: Mutex<Vec<(String, serde_json::Value)>>,
}

impl CrossWritingRemote {
    pub fn new(repository: Arc<InMemoryRepository>, trigger: &str, target: &str) -> Self {
        Self {
            repository,
            trigger: trigger.to_string(),
            target: target.to_string(),
            fired: AtomicBool::new(false),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<(String, serde_json::Value)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteAuthority for CrossWritingRemote {
    async fn push(&self, record: &SyncableRecord) -> Result<()> {
        self.received.lock().unwrap().push((record.id.clone(), record.payload.clone()));
        if record.id == self.trigger && !self.fired.swap(true, Ordering::SeqCst) {
            self.repository.save_local(&self.target, serde_json::json!({ "v": 2 })).await?;
        }
        Ok(())
    }
}

/// Remote that rewrites the record locally while "in flight".
pub struct RewritingRemote {
    pub repository: Arc<InMemoryRepository>,
}

#[async_trait]
impl RemoteAuthority for RewritingRemote {
    async fn push(&self, record: &SyncableRecord) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.repository.save_local(&record.id, serde_json::json!({ "rewritten": true })).await?;
        Ok(())
    }
}
