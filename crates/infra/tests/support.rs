//! Shared helpers for infra integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use chrono::{TimeZone, Utc};
use shuttlelink_domain::{GeoPoint, LocationSample, RecordKind};
use shuttlelink_infra::database::{DbManager, SqliteSyncRecordRepository};
use tempfile::TempDir;

/// Temporary migrated database that lives as long as the value.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager =
            DbManager::new(temp_dir.path().join("test.db"), 4).expect("db manager should be created");
        manager.run_migrations().expect("migrations should run");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn repository(&self, kind: RecordKind) -> Arc<SqliteSyncRecordRepository> {
        Arc::new(SqliteSyncRecordRepository::new(Arc::clone(&self.manager), kind))
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Route tracing output through the test harness once per binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("shuttlelink_core=debug,shuttlelink_infra=debug"))
            .with_test_writer()
            .try_init();
    });
}

/// Sample `secs` after 2025-03-01 08:00 UTC.
pub fn sample_at(secs: i64) -> LocationSample {
    let base = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    LocationSample::new(
        GeoPoint::new(41.0082 + secs as f64 * 0.0001, 28.9784),
        90.0,
        9.5,
        base + chrono::Duration::seconds(secs),
    )
}
