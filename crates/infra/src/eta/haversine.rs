//! Offline route estimator.
//!
//! Great-circle distance stretched by a road factor, driven at a fixed
//! average speed. The traffic figure scales the free-flow duration.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use shuttlelink_core::RouteEstimator;
use shuttlelink_domain::{EtaConfig, EtaDestination, GeoPoint, Result, RouteEta, ShuttleError};

/// Clock used to stamp arrival times.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct HaversineRouteEstimator {
    average_speed_kmh: f64,
    road_factor: f64,
    traffic_factor: f64,
    clock: Clock,
}

impl fmt::Debug for HaversineRouteEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HaversineRouteEstimator")
            .field("average_speed_kmh", &self.average_speed_kmh)
            .field("road_factor", &self.road_factor)
            .field("traffic_factor", &self.traffic_factor)
            .finish_non_exhaustive()
    }
}

impl HaversineRouteEstimator {
    pub fn new(config: &EtaConfig) -> Result<Self> {
        if !(config.average_speed_kmh.is_finite() && config.average_speed_kmh > 0.0) {
            return Err(ShuttleError::Config(format!(
                "average speed must be positive, got {}",
                config.average_speed_kmh
            )));
        }
        if config.road_factor < 1.0 || config.traffic_factor < 1.0 {
            return Err(ShuttleError::Config("road and traffic factors must be >= 1".into()));
        }

        Ok(Self {
            average_speed_kmh: config.average_speed_kmh,
            road_factor: config.road_factor,
            traffic_factor: config.traffic_factor,
            clock: Arc::new(Utc::now),
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn compute(&self, origin: GeoPoint, destination: &EtaDestination, now: DateTime<Utc>) -> RouteEta {
        let distance_km = origin.distance_km(destination.position) * self.road_factor;
        let minutes = distance_km / self.average_speed_kmh * 60.0;
        let duration_minutes = minutes.ceil() as u32;
        let traffic_minutes = (minutes * self.traffic_factor).ceil() as u32;

        RouteEta {
            destination_id: destination.id.clone(),
            estimated_arrival_time: now + Duration::minutes(i64::from(traffic_minutes)),
            distance_km,
            duration_minutes,
            traffic_duration_minutes: Some(traffic_minutes),
        }
    }
}

#[async_trait]
impl RouteEstimator for HaversineRouteEstimator {
    async fn estimate(&self, origin: GeoPoint, destination: &EtaDestination) -> Result<RouteEta> {
        Ok(self.compute(origin, destination, (self.clock)()))
    }

    async fn estimate_batch(
        &self,
        origin: GeoPoint,
        destinations: &[EtaDestination],
    ) -> Result<Vec<RouteEta>> {
        let now = (self.clock)();
        Ok(destinations.iter().map(|destination| self.compute(origin, destination, now)).collect())
    }
}
