//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `SHUTTLELINK_DB_PATH`: Database file path (required for env loading)
//! - `SHUTTLELINK_DB_POOL_SIZE`: Connection pool size
//! - `SHUTTLELINK_SYNC_INTERVAL`: Sync interval in seconds
//! - `SHUTTLELINK_SYNC_ENABLED`: Whether periodic sync is enabled (true/false)
//! - `SHUTTLELINK_SYNC_PUSH_TIMEOUT`: Per-record push timeout in seconds
//! - `SHUTTLELINK_TRACKING_ENABLED`: Whether tracking is enabled (true/false)
//! - `SHUTTLELINK_ROUTE_ID` / `SHUTTLELINK_DRIVER_ID`: Session context
//! - `SHUTTLELINK_FORWARD_QUEUE_CAPACITY`: Forward queue bound
//! - `SHUTTLELINK_REPLAY_FILE`: Replay a recorded track instead of stdin
//! - `SHUTTLELINK_REPLAY_INTERVAL_MS` / `SHUTTLELINK_REPLAY_LOOP`: Replay pacing
//! - `SHUTTLELINK_REALTIME_URL`: Realtime channel base URL
//! - `SHUTTLELINK_API_URL`: Remote authority base URL
//! - `SHUTTLELINK_API_TOKEN`: Bearer token for the remote authority (also
//!   applied on top of file-based configuration)
//! - `SHUTTLELINK_ETA_AVERAGE_SPEED`: Average speed in km/h for estimates
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./shuttlelink.json` or `./shuttlelink.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use shuttlelink_domain::{Config, DatabaseConfig, Result, ShuttleError};

const TOKEN_VAR: &str = "SHUTTLELINK_API_TOKEN";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `ShuttleError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `SHUTTLELINK_DB_PATH` must be present; every other variable falls back
/// to its default.
///
/// # Errors
/// Returns `ShuttleError::Config` if the database path is missing or a
/// numeric variable cannot be parsed.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config {
        database: DatabaseConfig { path: env_var("SHUTTLELINK_DB_PATH")?, ..DatabaseConfig::default() },
        ..Config::default()
    };

    if let Some(pool_size) = env_parse("SHUTTLELINK_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }

    if let Some(interval) = env_parse("SHUTTLELINK_SYNC_INTERVAL")? {
        config.sync.interval_seconds = interval;
    }
    config.sync.enabled = env_bool("SHUTTLELINK_SYNC_ENABLED", config.sync.enabled);
    if let Some(timeout) = env_parse("SHUTTLELINK_SYNC_PUSH_TIMEOUT")? {
        config.sync.push_timeout_seconds = timeout;
    }

    config.tracking.enabled = env_bool("SHUTTLELINK_TRACKING_ENABLED", config.tracking.enabled);
    config.tracking.route_id = std::env::var("SHUTTLELINK_ROUTE_ID").ok();
    config.tracking.driver_id = std::env::var("SHUTTLELINK_DRIVER_ID").ok();
    if let Some(capacity) = env_parse("SHUTTLELINK_FORWARD_QUEUE_CAPACITY")? {
        config.tracking.forward_queue_capacity = capacity;
    }
    config.tracking.replay_file = std::env::var("SHUTTLELINK_REPLAY_FILE").ok();
    if let Some(interval) = env_parse("SHUTTLELINK_REPLAY_INTERVAL_MS")? {
        config.tracking.replay_interval_ms = interval;
    }
    config.tracking.replay_loop = env_bool("SHUTTLELINK_REPLAY_LOOP", config.tracking.replay_loop);

    if let Ok(url) = std::env::var("SHUTTLELINK_REALTIME_URL") {
        config.realtime.base_url = url;
    }
    if let Ok(url) = std::env::var("SHUTTLELINK_API_URL") {
        config.remote.base_url = url;
    }
    config.remote.api_token = std::env::var(TOKEN_VAR).ok();

    if let Some(speed) = env_parse("SHUTTLELINK_ETA_AVERAGE_SPEED")? {
        config.eta.average_speed_kmh = speed;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// `SHUTTLELINK_API_TOKEN` is applied on top so the token never has to live
/// in the file.
///
/// # Errors
/// Returns `ShuttleError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ShuttleError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ShuttleError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ShuttleError::Config(format!("Failed to read config file: {e}")))?;

    let mut config = parse_config(&contents, &config_path)?;
    if let Ok(token) = std::env::var(TOKEN_VAR) {
        config.remote.api_token = Some(token);
    }
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ShuttleError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ShuttleError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ShuttleError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its parents (up to 2 levels)
/// and the executable's directory.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("shuttlelink.json"),
        dir.join("shuttlelink.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `ShuttleError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| ShuttleError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable.
///
/// # Errors
/// Returns `ShuttleError::Config` when the variable is set but unparsable.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ShuttleError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ENV_KEYS: &[&str] = &[
        "SHUTTLELINK_DB_PATH",
        "SHUTTLELINK_DB_POOL_SIZE",
        "SHUTTLELINK_SYNC_INTERVAL",
        "SHUTTLELINK_SYNC_ENABLED",
        "SHUTTLELINK_SYNC_PUSH_TIMEOUT",
        "SHUTTLELINK_TRACKING_ENABLED",
        "SHUTTLELINK_ROUTE_ID",
        "SHUTTLELINK_DRIVER_ID",
        "SHUTTLELINK_FORWARD_QUEUE_CAPACITY",
        "SHUTTLELINK_REPLAY_FILE",
        "SHUTTLELINK_REPLAY_INTERVAL_MS",
        "SHUTTLELINK_REPLAY_LOOP",
        "SHUTTLELINK_REALTIME_URL",
        "SHUTTLELINK_API_URL",
        "SHUTTLELINK_API_TOKEN",
        "SHUTTLELINK_ETA_AVERAGE_SPEED",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn write_temp(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("TEST_BOOL_TRUE_YES", "yes");
        std::env::set_var("TEST_BOOL_TRUE_UPPER", "TRUE");
        std::env::set_var("TEST_BOOL_FALSE_OFF", "off");

        assert!(env_bool("TEST_BOOL_TRUE_YES", false));
        assert!(env_bool("TEST_BOOL_TRUE_UPPER", false));
        assert!(!env_bool("TEST_BOOL_FALSE_OFF", true));

        std::env::remove_var("TEST_BOOL_MISSING");
        assert!(env_bool("TEST_BOOL_MISSING", true));

        std::env::remove_var("TEST_BOOL_TRUE_YES");
        std::env::remove_var("TEST_BOOL_TRUE_UPPER");
        std::env::remove_var("TEST_BOOL_FALSE_OFF");
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("SHUTTLELINK_DB_PATH", "/tmp/test.db");
        std::env::set_var("SHUTTLELINK_DB_POOL_SIZE", "5");
        std::env::set_var("SHUTTLELINK_SYNC_INTERVAL", "15");
        std::env::set_var("SHUTTLELINK_SYNC_ENABLED", "false");
        std::env::set_var("SHUTTLELINK_ROUTE_ID", "route-9");
        std::env::set_var("SHUTTLELINK_DRIVER_ID", "driver-2");
        std::env::set_var("SHUTTLELINK_REALTIME_URL", "https://rt.example.com");
        std::env::set_var("SHUTTLELINK_API_TOKEN", "token-123");
        std::env::set_var("SHUTTLELINK_ETA_AVERAGE_SPEED", "24.5");
        std::env::set_var("SHUTTLELINK_REPLAY_FILE", "/tmp/track.json");
        std::env::set_var("SHUTTLELINK_REPLAY_INTERVAL_MS", "250");
        std::env::set_var("SHUTTLELINK_REPLAY_LOOP", "true");

        let result = load_from_env();
        assert!(result.is_ok(), "Should load config from env vars, error: {:?}", result.err());

        let config = result.unwrap();
        assert_eq!(config.database.path, "/tmp/test.db");
        assert_eq!(config.database.pool_size, 5);
        assert_eq!(config.sync.interval_seconds, 15);
        assert!(!config.sync.enabled);
        assert_eq!(config.tracking.route_id.as_deref(), Some("route-9"));
        assert_eq!(config.tracking.driver_id.as_deref(), Some("driver-2"));
        assert_eq!(config.realtime.base_url, "https://rt.example.com");
        assert_eq!(config.remote.api_token.as_deref(), Some("token-123"));
        assert!((config.eta.average_speed_kmh - 24.5).abs() < f64::EPSILON);
        assert_eq!(config.tracking.replay_file.as_deref(), Some("/tmp/track.json"));
        assert_eq!(config.tracking.replay_interval_ms, 250);
        assert!(config.tracking.replay_loop);

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_db_path() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, ShuttleError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("SHUTTLELINK_DB_PATH", "/tmp/test.db");
        std::env::set_var("SHUTTLELINK_DB_POOL_SIZE", "not-a-number");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, ShuttleError::Config(msg) if msg.contains("SHUTTLELINK_DB_POOL_SIZE")));

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let path = write_temp(
            r#"{
                "database": { "path": "test.db", "pool_size": 4 },
                "sync": { "interval_seconds": 20, "enabled": true, "push_timeout_seconds": 5 },
                "tracking": { "route_id": "route-1", "driver_id": "driver-1" }
            }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.database.path, "test.db");
        assert_eq!(config.sync.interval_seconds, 20);
        assert_eq!(config.sync.push_timeout_seconds, 5);
        assert_eq!(config.tracking.route_id.as_deref(), Some("route-1"));
        assert!(config.remote.api_token.is_none());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml_with_token_override() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("SHUTTLELINK_API_TOKEN", "from-env");

        let path = write_temp(
            r#"
[database]
path = "test.db"
pool_size = 6

[sync]
interval_seconds = 25
enabled = false

[eta]
average_speed_kmh = 40.0
road_factor = 1.2
traffic_factor = 1.0
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.database.pool_size, 6);
        assert!(!config.sync.enabled);
        assert!((config.eta.road_factor - 1.2).abs() < f64::EPSILON);
        assert_eq!(config.remote.api_token.as_deref(), Some("from-env"));

        std::fs::remove_file(path).ok();
        clear_env();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(ShuttleError::Config(_))));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = write_temp(r#"{ "this is": "not valid json" "#, "json");

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_err(), "Should fail with invalid JSON");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
