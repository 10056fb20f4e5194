//! Deterministic route estimator.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use shuttlelink_core::RouteEstimator;
use shuttlelink_domain::{EtaDestination, GeoPoint, Result, RouteEta, ShuttleError};

use super::base_time;

/// Straight-line distance at a constant 30 km/h, relative to `base_time()`.
#[derive(Default)]
pub struct LinearEstimator {
    pub single_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub fail_for: Option<String>,
}

impl LinearEstimator {
    pub fn failing_for(id: &str) -> Self {
        Self { fail_for: Some(id.to_string()), ..Self::default() }
    }

    fn compute(origin: GeoPoint, destination: &EtaDestination) -> RouteEta {
        let distance_km = origin.distance_km(destination.position);
        let duration_minutes = (distance_km / 30.0 * 60.0).ceil() as u32;
        let arrival: DateTime<Utc> = base_time() + Duration::minutes(i64::from(duration_minutes));
        RouteEta {
            destination_id: destination.id.clone(),
            estimated_arrival_time: arrival,
            distance_km,
            duration_minutes,
            traffic_duration_minutes: None,
        }
    }
}

#[async_trait]
impl RouteEstimator for LinearEstimator {
    async fn estimate(&self, origin: GeoPoint, destination: &EtaDestination) -> Result<RouteEta> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.as_deref() == Some(destination.id.as_str()) {
            return Err(ShuttleError::Network("routing backend unavailable".into()));
        }
        Ok(Self::compute(origin, destination))
    }

    async fn estimate_batch(
        &self,
        origin: GeoPoint,
        destinations: &[EtaDestination],
    ) -> Result<Vec<RouteEta>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut etas = Vec::with_capacity(destinations.len());
        for destination in destinations {
            if self.fail_for.as_deref() == Some(destination.id.as_str()) {
                return Err(ShuttleError::Network("routing backend unavailable".into()));
            }
            etas.push(Self::compute(origin, destination));
        }
        Ok(etas)
    }
}
