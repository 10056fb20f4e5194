//! Syncable entity payloads

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::sync::{RecordKind, SyncableRecord};
use crate::errors::{Result, ShuttleError};

/// An entity cached locally and pushed to the backend by the sync engine.
pub trait SyncEntity: Serialize + DeserializeOwned {
    const KIND: RecordKind;

    /// Encode as a dirty record ready to be saved locally.
    fn to_record(&self, id: impl Into<String>, updated_at: DateTime<Utc>) -> Result<SyncableRecord> {
        let payload = serde_json::to_value(self)?;
        Ok(SyncableRecord::dirty(id, Self::KIND, payload, updated_at))
    }

    /// Decode the payload of a record of the matching kind.
    fn from_record(record: &SyncableRecord) -> Result<Self> {
        if record.kind != Self::KIND {
            return Err(ShuttleError::InvalidInput(format!(
                "expected {} record, got {}",
                Self::KIND,
                record.kind
            )));
        }
        Ok(serde_json::from_value(record.payload.clone())?)
    }
}

/// Rider or staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl SyncEntity for Person {
    const KIND: RecordKind = RecordKind::Person;
}

/// A pickup or drop-off point on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_minutes: Option<u32>,
}

impl SyncEntity for Stop {
    const KIND: RecordKind = RecordKind::Stop;
}

/// One run of a vehicle along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub route_name: String,
    pub vehicle_plate: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl SyncEntity for Service {
    const KIND: RecordKind = RecordKind::Service;
}
