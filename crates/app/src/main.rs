//! ShuttleLink - vehicle tracking agent
//!
//! Reads location samples as JSON lines on stdin, or replays a recorded
//! track when one is configured, publishes them through the tracking session
//! and echoes every published location on stdout. The sync scheduler runs in
//! the background until the input ends or Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use shuttlelink_app::utils::tracing_setup::init_tracing;
use shuttlelink_app::AppContext;
use shuttlelink_domain::{LocationSample, TrackingState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the subscriber so RUST_LOG from the file applies
    let dotenv = dotenvy::dotenv();
    init_tracing();
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(err) => info!(error = %err, "No .env file loaded"),
    }

    info!(version = env!("CARGO_PKG_VERSION"), "ShuttleLink starting");

    let ctx = Arc::new(AppContext::new().await.context("failed to build application context")?);
    ctx.start_background().await.context("failed to start background services")?;

    let echo = tokio::spawn(echo_locations(Arc::clone(&ctx)));

    tokio::select! {
        result = drive_input(&ctx) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupt received"),
    }

    ctx.shutdown().await.context("shutdown failed")?;
    echo.abort();
    info!("ShuttleLink stopped");
    Ok(())
}

async fn drive_input(ctx: &AppContext) -> anyhow::Result<()> {
    if ctx.is_replaying() {
        let mut state = ctx.tracking.subscribe_state();
        state
            .wait_for(|state| *state == TrackingState::Idle)
            .await
            .context("tracking state channel closed")?;
        info!("Replay finished");
        return Ok(());
    }
    read_samples(ctx).await
}

async fn read_samples(ctx: &AppContext) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<LocationSample>(line) {
            Ok(sample) => {
                if !ctx.location_source.push(sample) {
                    warn!("Sample not accepted by the location source");
                }
            }
            Err(err) => warn!(error = %err, "Skipping malformed sample"),
        }
    }

    info!("stdin closed");
    Ok(())
}

async fn echo_locations(ctx: Arc<AppContext>) {
    let mut subscription = ctx.store.subscribe();
    while let Some(location) = subscription.next().await {
        match serde_json::to_string(&location) {
            Ok(json) => println!("{json}"),
            Err(err) => warn!(error = %err, "Failed to encode location"),
        }
    }
}
