//! Offline-first sync types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ShuttleError;

/// Kind of locally-cached record that can be pushed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Person,
    Stop,
    Service,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Person, RecordKind::Stop, RecordKind::Service];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Stop => "stop",
            Self::Service => "service",
        }
    }

    /// SQLite table backing this kind.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Person => "persons",
            Self::Stop => "stops",
            Self::Service => "services",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = ShuttleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person" => Ok(Self::Person),
            "stop" => Ok(Self::Stop),
            "service" => Ok(Self::Service),
            other => Err(ShuttleError::InvalidInput(format!("unknown record kind: {other}"))),
        }
    }
}

/// A locally-cached entity carrying a dirty flag.
///
/// A record with `needs_sync == false` always has `last_synced_at` set to a
/// time at or after `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncableRecord {
    pub id: String,
    pub kind: RecordKind,
    pub payload: serde_json::Value,
    pub needs_sync: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SyncableRecord {
    /// A freshly written local record awaiting its first push.
    pub fn dirty(
        id: impl Into<String>,
        kind: RecordKind,
        payload: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self { id: id.into(), kind, payload, needs_sync: true, last_synced_at: None, updated_at }
    }
}

/// A record the remote authority did not accept during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub kind: RecordKind,
    pub id: String,
    pub reason: String,
}

/// Outcome of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub attempted: usize,
    pub synced: usize,
    /// Acknowledged by the backend but rewritten locally during the push, so
    /// still dirty.
    pub superseded: usize,
    pub failed: Vec<FailedRecord>,
}

impl SyncReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Observable status of the sync engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Started,
    Success(SyncReport),
    Error(String),
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }
}
