//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AVERAGE_SPEED_KMH, DEFAULT_FORWARD_QUEUE_CAPACITY, DEFAULT_JOIN_TIMEOUT_MS,
    DEFAULT_REPLAY_INTERVAL_MS, DEFAULT_ROAD_FACTOR, DEFAULT_SEND_TIMEOUT_MS, DEFAULT_TRAFFIC_FACTOR,
    DEFAULT_WEBSOCKET_BASE_URL,
};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub eta: EtaConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "shuttlelink.db".to_string(), pool_size: 4 }
    }
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_seconds: u64,
    pub enabled: bool,
    pub push_timeout_seconds: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { interval_seconds: 300, enabled: true, push_timeout_seconds: 15 }
    }
}

/// Live tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,
    /// Route the vehicle is serving; resolved into every published location.
    pub route_id: Option<String>,
    /// Driver operating the vehicle.
    pub driver_id: Option<String>,
    pub forward_queue_capacity: usize,
    pub join_timeout_ms: u64,
    /// JSON array of samples to replay instead of reading live samples.
    pub replay_file: Option<String>,
    pub replay_interval_ms: u64,
    pub replay_loop: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            route_id: None,
            driver_id: None,
            forward_queue_capacity: DEFAULT_FORWARD_QUEUE_CAPACITY,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            replay_file: None,
            replay_interval_ms: DEFAULT_REPLAY_INTERVAL_MS,
            replay_loop: false,
        }
    }
}

/// Realtime location channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RealtimeConfig {
    pub base_url: String,
    pub send_timeout_ms: u64,
    pub max_connect_attempts: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEBSOCKET_BASE_URL.to_string(),
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            max_connect_attempts: 3,
        }
    }
}

/// Remote authority (sync push target) configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            request_timeout_seconds: 30,
            api_token: None,
        }
    }
}

/// ETA estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EtaConfig {
    pub average_speed_kmh: f64,
    /// Multiplier from straight-line distance to road distance.
    pub road_factor: f64,
    /// Multiplier from free-flow duration to duration in traffic.
    pub traffic_factor: f64,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
            road_factor: DEFAULT_ROAD_FACTOR,
            traffic_factor: DEFAULT_TRAFFIC_FACTOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_default_when_missing() {
        let config: Config =
            serde_json::from_str(r#"{ "database": { "path": "a.db", "pool_size": 2 } }"#).unwrap();
        assert_eq!(config.database.pool_size, 2);
        assert_eq!(config.sync, SyncConfig::default());
        assert_eq!(config.tracking.forward_queue_capacity, DEFAULT_FORWARD_QUEUE_CAPACITY);
        assert!(config.tracking.replay_file.is_none());
    }

    #[test]
    fn replay_settings_parse_with_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "database": { "path": "a.db", "pool_size": 2 },
                 "tracking": { "replay_file": "track.json" } }"#,
        )
        .unwrap();
        assert_eq!(config.tracking.replay_file.as_deref(), Some("track.json"));
        assert_eq!(config.tracking.replay_interval_ms, DEFAULT_REPLAY_INTERVAL_MS);
        assert!(!config.tracking.replay_loop);
    }

    #[test]
    fn api_token_is_never_serialized() {
        let mut config = Config::default();
        config.remote.api_token = Some("secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
