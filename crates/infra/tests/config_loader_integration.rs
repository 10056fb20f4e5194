//! Integration tests for configuration loader
//!
//! Loads complete configuration files the way a deployment ships them.

use std::io::Write;

use shuttlelink_domain::ShuttleError;
use shuttlelink_infra::config;
use tempfile::Builder;

fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new()
        .suffix(&format!(".{extension}"))
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    file
}

#[test]
fn test_load_config_from_json_file() {
    let file = write_config(
        "json",
        r#"{
            "database": { "path": "/tmp/fleet.db", "pool_size": 6 },
            "sync": { "interval_seconds": 60, "enabled": true, "push_timeout_seconds": 10 },
            "tracking": {
                "enabled": true,
                "route_id": "route-7",
                "driver_id": "driver-3",
                "forward_queue_capacity": 16,
                "join_timeout_ms": 2000
            },
            "realtime": { "base_url": "https://rt.example.com", "send_timeout_ms": 1500, "max_connect_attempts": 5 },
            "remote": { "base_url": "https://api.example.com", "request_timeout_seconds": 20 },
            "eta": { "average_speed_kmh": 25.0, "road_factor": 1.4, "traffic_factor": 1.2 }
        }"#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf())).unwrap();

    assert_eq!(config.database.path, "/tmp/fleet.db");
    assert_eq!(config.database.pool_size, 6);
    assert_eq!(config.sync.push_timeout_seconds, 10);
    assert_eq!(config.tracking.route_id.as_deref(), Some("route-7"));
    assert_eq!(config.tracking.forward_queue_capacity, 16);
    assert_eq!(config.realtime.max_connect_attempts, 5);
    assert_eq!(config.remote.request_timeout_seconds, 20);
    assert!((config.eta.road_factor - 1.4).abs() < f64::EPSILON);
}

#[test]
fn test_load_config_from_toml_file() {
    let file = write_config(
        "toml",
        r#"
[database]
path = "/tmp/fleet_toml.db"
pool_size = 2

[sync]
interval_seconds = 120
enabled = false

[tracking]
route_id = "route-1"
"#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf())).unwrap();

    assert_eq!(config.database.path, "/tmp/fleet_toml.db");
    assert_eq!(config.sync.interval_seconds, 120);
    assert!(!config.sync.enabled);
    assert_eq!(config.tracking.route_id.as_deref(), Some("route-1"));
    assert_eq!(config.tracking.driver_id, None);
    assert_eq!(config.realtime, Default::default());
}

#[test]
fn test_load_config_from_nonexistent_file() {
    let result = config::load_from_file(Some("/nonexistent/path/config.json".into()));

    match result {
        Err(ShuttleError::Config(msg)) => assert!(msg.contains("not found"), "{msg}"),
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[test]
fn test_load_config_with_invalid_format() {
    let file = write_config("json", r#"{ "this is": "not valid" "#);

    match config::load_from_file(Some(file.path().to_path_buf())) {
        Err(ShuttleError::Config(msg)) => assert!(msg.contains("Invalid JSON"), "{msg}"),
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let file = write_config("yaml", "database: {}");

    let result = config::load_from_file(Some(file.path().to_path_buf()));
    assert!(matches!(result, Err(ShuttleError::Config(_))));
}
