//! Arrival estimate commands

use std::time::Instant;

use shuttlelink_domain::{EtaDestination, GeoPoint, Result, RouteEta};
use tracing::info;

use crate::utils::logging::{error_label, log_command_execution};
use crate::AppContext;

/// ETAs from the vehicle's current location to each stop, in input order
pub async fn stop_etas(ctx: &AppContext, stops: &[EtaDestination]) -> Result<Vec<RouteEta>> {
    let command_name = "eta::stop_etas";
    let start = Instant::now();

    info!(command = command_name, stops = stops.len(), "Computing stop ETAs");

    let result = ctx.eta.from_current(&ctx.store, stops).await.map_err(Into::into);

    let error_type = result.as_ref().err().map(error_label);
    log_command_execution(command_name, start.elapsed(), result.is_ok(), error_type);
    result
}

/// ETA between two arbitrary points
pub async fn route_eta(
    ctx: &AppContext,
    origin: GeoPoint,
    destination: &EtaDestination,
) -> Result<RouteEta> {
    let command_name = "eta::route_eta";
    let start = Instant::now();

    let result = ctx.eta.single(origin, destination).await.map_err(Into::into);

    let error_type = result.as_ref().err().map(error_label);
    log_command_execution(command_name, start.elapsed(), result.is_ok(), error_type);
    result
}
