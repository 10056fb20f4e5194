//! Wire format for locations pushed over the realtime channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shuttlelink_domain::constants::REALTIME_LOCATIONS_PATH;
use shuttlelink_domain::{GeoPoint, Result, ShuttleError, VehicleLocation};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireCoordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One location as the realtime backend expects it. Timestamps travel as
/// epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMessage {
    pub id: String,
    pub route_id: String,
    pub driver_id: String,
    pub location: WireCoordinates,
    pub heading: f32,
    pub speed: f32,
    pub timestamp: i64,
    pub is_active: bool,
}

impl From<&VehicleLocation> for LocationMessage {
    fn from(location: &VehicleLocation) -> Self {
        Self {
            id: location.id.clone(),
            route_id: location.route_id.clone(),
            driver_id: location.driver_id.clone(),
            location: WireCoordinates {
                lat: location.position.latitude,
                lng: location.position.longitude,
            },
            heading: location.heading,
            speed: location.speed,
            timestamp: location.timestamp.timestamp_millis(),
            is_active: location.is_active,
        }
    }
}

impl LocationMessage {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.location.lat, self.location.lng)
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Derive the realtime endpoint from a service base URL.
///
/// `http` becomes `ws`, `https` becomes `wss`; URLs already using a
/// websocket scheme are kept.
pub fn realtime_url(base_url: &str) -> Result<String> {
    let base = base_url.trim().trim_end_matches('/');
    let converted = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("wss://") || base.starts_with("ws://") {
        base.to_string()
    } else {
        return Err(ShuttleError::Config(format!("unsupported realtime base URL: {base_url}")));
    };

    if converted.ends_with(REALTIME_LOCATIONS_PATH) {
        Ok(converted)
    } else {
        Ok(format!("{converted}{REALTIME_LOCATIONS_PATH}"))
    }
}
