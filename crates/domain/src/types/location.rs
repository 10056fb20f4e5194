//! Vehicle position types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::EARTH_RADIUS_KM;

/// A WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Haversine great-circle distance in kilometres.
    pub fn distance_km(self, other: Self) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();

        let a = (d_lat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// True when both coordinates are finite and inside their valid ranges.
    pub fn is_valid(self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Raw position sample emitted by a location source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub position: GeoPoint,
    /// Bearing in degrees clockwise from north.
    pub heading: f32,
    /// Ground speed in metres per second.
    pub speed: f32,
    /// Horizontal accuracy radius in metres, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn new(position: GeoPoint, heading: f32, speed: f32, timestamp: DateTime<Utc>) -> Self {
        Self { position, heading, speed, accuracy: None, timestamp }
    }

    /// Attach a horizontal accuracy radius.
    #[must_use]
    pub fn with_accuracy(mut self, accuracy: f32) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

/// Route and driver identifiers of the active tracking session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub route_id: String,
    pub driver_id: String,
}

impl SessionContext {
    pub fn new(route_id: impl Into<String>, driver_id: impl Into<String>) -> Self {
        Self { route_id: route_id.into(), driver_id: driver_id.into() }
    }
}

/// The current location of a tracked vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleLocation {
    pub id: String,
    pub route_id: String,
    pub driver_id: String,
    pub position: GeoPoint,
    pub heading: f32,
    pub speed: f32,
    pub timestamp: DateTime<Utc>,
    pub is_active: bool,
}

impl VehicleLocation {
    /// Build a location from a raw sample and the session it belongs to.
    pub fn from_sample(sample: &LocationSample, context: &SessionContext) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            route_id: context.route_id.clone(),
            driver_id: context.driver_id.clone(),
            position: sample.position,
            heading: sample.heading,
            speed: sample.speed,
            timestamp: sample.timestamp,
            is_active: true,
        }
    }
}

/// Lifecycle state of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    #[default]
    Idle,
    Running,
}

impl TrackingState {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}
