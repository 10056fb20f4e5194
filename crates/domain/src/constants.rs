//! Application constants
//!
//! Centralized location for domain-level constants used throughout the
//! application.

// Tracking pipeline
pub const DEFAULT_FORWARD_QUEUE_CAPACITY: usize = 32;
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REPLAY_INTERVAL_MS: u64 = 1_000;

// Realtime channel
pub const DEFAULT_WEBSOCKET_BASE_URL: &str = "wss://dev.shuttlelink.example/ws";
pub const REALTIME_LOCATIONS_PATH: &str = "/realtime/locations";
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 3_000;
pub const MAX_RECONNECT_BACKOFF_SECS: u64 = 30;

// ETA estimation
pub const EARTH_RADIUS_KM: f64 = 6_371.0;
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 31.0;
pub const DEFAULT_ROAD_FACTOR: f64 = 1.3;
pub const DEFAULT_TRAFFIC_FACTOR: f64 = 1.15;

// Sync
pub const MAX_SYNC_ERROR_LEN: usize = 256;
