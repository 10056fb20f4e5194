//! Live tracking commands

use std::time::Instant;

use shuttlelink_core::{PipelineSnapshot, StartOutcome};
use shuttlelink_domain::{LocationSample, Result, TrackingState, VehicleLocation};
use tracing::info;

use crate::utils::logging::{error_label, log_command_execution};
use crate::AppContext;

/// Start the tracking session
pub async fn start_tracking(ctx: &AppContext) -> Result<StartOutcome> {
    let command_name = "tracking::start_tracking";
    let start = Instant::now();

    info!(command = command_name, "Starting tracking session");

    let result = ctx.tracking.start().await.map_err(Into::into);
    finish(command_name, start, &result);
    result
}

/// Stop the tracking session. Idempotent.
pub async fn stop_tracking(ctx: &AppContext) -> Result<()> {
    let command_name = "tracking::stop_tracking";
    let start = Instant::now();

    info!(command = command_name, "Stopping tracking session");

    ctx.tracking.stop().await;
    let result = Ok(());
    finish(command_name, start, &result);
    result
}

/// Publish a manually supplied sample
pub async fn submit_sample(ctx: &AppContext, sample: LocationSample) -> Result<VehicleLocation> {
    let command_name = "tracking::submit_sample";
    let start = Instant::now();

    let result = ctx.tracking.submit_sample(sample).await.map_err(Into::into);
    finish(command_name, start, &result);
    result
}

pub fn current_location(ctx: &AppContext) -> Option<VehicleLocation> {
    ctx.store.current()
}

pub fn tracking_state(ctx: &AppContext) -> TrackingState {
    ctx.tracking.state()
}

pub fn tracking_stats(ctx: &AppContext) -> PipelineSnapshot {
    ctx.tracking.stats()
}

/// Switch the route and driver stamped on subsequent locations
pub fn set_session(ctx: &AppContext, route_id: String, driver_id: String) {
    info!(command = "tracking::set_session", %route_id, "Updating session context");
    ctx.session_context.set_route(route_id);
    ctx.session_context.set_driver(driver_id);
}

fn finish<T>(command: &str, start: Instant, result: &Result<T>) {
    let error_type = result.as_ref().err().map(error_label);
    log_command_execution(command, start.elapsed(), result.is_ok(), error_type);
}
