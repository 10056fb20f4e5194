//! Shared test helpers for `shuttlelink-core` integration tests.
//!
//! In-memory fakes for every core port so tests can focus on pipeline and
//! sync behaviour instead of transport details.

#![allow(dead_code)]

pub mod eta;
pub mod sync;
pub mod tracking;

use chrono::{DateTime, TimeZone, Utc};

/// Fixed base instant so timestamps in assertions are stable.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

/// `base_time()` shifted by `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::seconds(secs)
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within two seconds");
}
