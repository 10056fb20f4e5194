//! Arrival estimates from the vehicle to one or more stops.

use std::sync::Arc;

use shuttlelink_domain::{EtaDestination, GeoPoint, RouteEta, ShuttleError};
use thiserror::Error;
use tracing::{debug, instrument};

use super::ports::RouteEstimator;
use crate::tracking::VehicleLocationStore;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EtaError {
    #[error("route estimator failed: {0}")]
    Estimator(ShuttleError),

    #[error("no current vehicle location")]
    NoCurrentLocation,

    #[error("invalid coordinates {0}")]
    InvalidCoordinates(GeoPoint),

    #[error("estimator returned {actual} estimates for {expected} destinations")]
    CountMismatch { expected: usize, actual: usize },

    #[error("estimate {index} is for {actual}, expected {expected}")]
    DestinationMismatch { index: usize, expected: String, actual: String },
}

impl From<EtaError> for ShuttleError {
    fn from(err: EtaError) -> Self {
        match err {
            EtaError::Estimator(inner) => inner,
            EtaError::NoCurrentLocation => ShuttleError::NotFound(err.to_string()),
            EtaError::InvalidCoordinates(_) => ShuttleError::InvalidInput(err.to_string()),
            EtaError::CountMismatch { .. } | EtaError::DestinationMismatch { .. } => {
                ShuttleError::Internal(err.to_string())
            }
        }
    }
}

/// Computes [`RouteEta`]s through a [`RouteEstimator`].
///
/// Batches are all-or-nothing and preserve input order. A batch of one is
/// computed exactly like [`single`](Self::single).
#[derive(Clone)]
pub struct EtaEngine {
    estimator: Arc<dyn RouteEstimator>,
}

impl EtaEngine {
    pub fn new(estimator: Arc<dyn RouteEstimator>) -> Self {
        Self { estimator }
    }

    #[instrument(skip(self), fields(destination = %destination.id))]
    pub async fn single(
        &self,
        origin: GeoPoint,
        destination: &EtaDestination,
    ) -> Result<RouteEta, EtaError> {
        validate(origin)?;
        validate(destination.position)?;

        let eta = self.estimator.estimate(origin, destination).await.map_err(EtaError::Estimator)?;
        if eta.destination_id != destination.id {
            return Err(EtaError::DestinationMismatch {
                index: 0,
                expected: destination.id.clone(),
                actual: eta.destination_id,
            });
        }
        Ok(eta)
    }

    #[instrument(skip(self, destinations), fields(count = destinations.len()))]
    pub async fn batch(
        &self,
        origin: GeoPoint,
        destinations: &[EtaDestination],
    ) -> Result<Vec<RouteEta>, EtaError> {
        match destinations {
            [] => return Ok(Vec::new()),
            [only] => return Ok(vec![self.single(origin, only).await?]),
            _ => {}
        }

        validate(origin)?;
        for destination in destinations {
            validate(destination.position)?;
        }

        let etas = self
            .estimator
            .estimate_batch(origin, destinations)
            .await
            .map_err(EtaError::Estimator)?;

        if etas.len() != destinations.len() {
            return Err(EtaError::CountMismatch {
                expected: destinations.len(),
                actual: etas.len(),
            });
        }
        for (index, (eta, destination)) in etas.iter().zip(destinations).enumerate() {
            if eta.destination_id != destination.id {
                return Err(EtaError::DestinationMismatch {
                    index,
                    expected: destination.id.clone(),
                    actual: eta.destination_id.clone(),
                });
            }
        }

        debug!(count = etas.len(), "Batch ETA computed");
        Ok(etas)
    }

    /// Estimate from the vehicle's current published location.
    pub async fn from_current(
        &self,
        store: &VehicleLocationStore,
        destinations: &[EtaDestination],
    ) -> Result<Vec<RouteEta>, EtaError> {
        let current = store.current().ok_or(EtaError::NoCurrentLocation)?;
        self.batch(current.position, destinations).await
    }
}

fn validate(point: GeoPoint) -> Result<(), EtaError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(EtaError::InvalidCoordinates(point))
    }
}
