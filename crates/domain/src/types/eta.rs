//! Arrival estimate types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::GeoPoint;

/// A stop to estimate the arrival at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaDestination {
    pub id: String,
    pub position: GeoPoint,
}

impl EtaDestination {
    pub fn new(id: impl Into<String>, position: GeoPoint) -> Self {
        Self { id: id.into(), position }
    }
}

/// Estimated arrival at one destination. Computed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEta {
    pub destination_id: String,
    pub estimated_arrival_time: DateTime<Utc>,
    pub distance_km: f64,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_duration_minutes: Option<u32>,
}

impl RouteEta {
    /// Duration the rider should expect, preferring the traffic-aware figure.
    pub fn effective_duration_minutes(&self) -> u32 {
        self.traffic_duration_minutes.unwrap_or(self.duration_minutes)
    }
}
