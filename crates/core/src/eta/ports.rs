//! Port interfaces for arrival estimation

use async_trait::async_trait;
use shuttlelink_domain::{EtaDestination, GeoPoint, Result, RouteEta};

/// Trait for routing backends that estimate travel to a destination
#[async_trait]
pub trait RouteEstimator: Send + Sync {
    /// Estimate travel from `origin` to one destination
    async fn estimate(&self, origin: GeoPoint, destination: &EtaDestination) -> Result<RouteEta>;

    /// Estimate travel to several destinations, in input order.
    ///
    /// The default estimates each destination in turn. Backends with a
    /// matrix endpoint should override it.
    async fn estimate_batch(
        &self,
        origin: GeoPoint,
        destinations: &[EtaDestination],
    ) -> Result<Vec<RouteEta>> {
        let mut etas = Vec::with_capacity(destinations.len());
        for destination in destinations {
            etas.push(self.estimate(origin, destination).await?);
        }
        Ok(etas)
    }
}
