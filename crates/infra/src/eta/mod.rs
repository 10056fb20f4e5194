//! Route estimator adapters

pub mod haversine;

pub use haversine::{Clock, HaversineRouteEstimator};
