#![allow(dead_code)]

use std::net::TcpListener;

use chrono::{DateTime, Duration, TimeZone, Utc};
use shuttlelink_app::AppContext;
use shuttlelink_domain::{Config, DatabaseConfig, GeoPoint, LocationSample};
use tempfile::TempDir;
use wiremock::MockServer;

/// Application context backed by a temp database and a mock remote.
pub struct TestApp {
    pub ctx: AppContext,
    pub remote: MockServer,
    _temp_dir: TempDir,
}

/// Build a context with sync disabled and a realtime endpoint that refuses
/// connections. `configure` can override anything before wiring.
pub async fn test_app(configure: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = TempDir::new().expect("failed to create temporary test directory");
    let remote = MockServer::start().await;

    let mut config = Config {
        database: DatabaseConfig {
            path: temp_dir.path().join("shuttlelink.db").to_string_lossy().to_string(),
            pool_size: 4,
        },
        ..Config::default()
    };
    config.sync.enabled = false;
    config.sync.push_timeout_seconds = 5;
    config.tracking.route_id = Some("route-7".into());
    config.tracking.driver_id = Some("driver-3".into());
    config.realtime.base_url = format!("ws://{}", closed_addr());
    config.realtime.max_connect_attempts = 1;
    config.remote.base_url = remote.uri();
    configure(&mut config);

    let ctx = AppContext::new_with_config(config).await.expect("failed to build context");
    TestApp { ctx, remote, _temp_dir: temp_dir }
}

/// Sample `secs` seconds after a fixed base time, moving north.
pub fn sample_at(secs: i64) -> LocationSample {
    LocationSample::new(
        GeoPoint::new(41.0082 + secs as f64 * 0.0001, 28.9784),
        0.0,
        8.5,
        base_time() + Duration::seconds(secs),
    )
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).single().expect("valid base time")
}

fn closed_addr() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("ephemeral address");
    drop(listener);
    addr
}
