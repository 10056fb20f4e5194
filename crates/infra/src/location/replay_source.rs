//! Location source that replays a recorded or synthesised track.
//!
//! Each emitted sample is restamped with the wall clock so a replayed track
//! is never rejected as stale by the location store.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use parking_lot::Mutex;
use shuttlelink_core::{LocationSource, SampleStream};
use shuttlelink_domain::{GeoPoint, LocationSample, Result, ShuttleError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Replays samples at a fixed cadence between `start_updates` and
/// `stop_updates`. The stream ends after the last sample unless looping.
pub struct ReplayLocationSource {
    track: Arc<Vec<LocationSample>>,
    cadence: Duration,
    looping: bool,
    cycle: Mutex<Option<CancellationToken>>,
}

impl ReplayLocationSource {
    pub fn new(track: Vec<LocationSample>, cadence: Duration) -> Self {
        Self { track: Arc::new(track), cadence, looping: false, cycle: Mutex::new(None) }
    }

    /// Restart from the first sample after the last one.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Load a JSON array of samples.
    pub fn from_json_file(path: impl AsRef<Path>, cadence: Duration) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ShuttleError::Config(format!("failed to read track {}: {err}", path.display()))
        })?;
        let track: Vec<LocationSample> = serde_json::from_str(&raw)?;
        Ok(Self::new(track, cadence))
    }

    /// Build a track through `waypoints`, inserting `steps` evenly spaced
    /// points between each pair. Heading follows the leg being driven.
    pub fn from_waypoints(
        waypoints: &[GeoPoint],
        steps: usize,
        speed_mps: f32,
        cadence: Duration,
    ) -> Self {
        let now = Utc::now();
        let mut track = Vec::new();

        for leg in waypoints.windows(2) {
            let (start, end) = (leg[0], leg[1]);
            let heading = bearing_degrees(start, end);
            for step in 0..=steps {
                let ratio = step as f64 / (steps + 1) as f64;
                let point = GeoPoint::new(
                    start.latitude + (end.latitude - start.latitude) * ratio,
                    start.longitude + (end.longitude - start.longitude) * ratio,
                );
                track.push(LocationSample::new(point, heading, speed_mps, now));
            }
        }
        if let Some(last) = waypoints.last() {
            let heading = track.last().map_or(0.0, |sample| sample.heading);
            track.push(LocationSample::new(*last, heading, 0.0, now));
        }

        Self::new(track, cadence)
    }

    pub fn len(&self) -> usize {
        self.track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }
}

#[async_trait]
impl LocationSource for ReplayLocationSource {
    async fn start_updates(&self) -> Result<()> {
        if self.track.is_empty() {
            return Err(ShuttleError::Location("replay track is empty".into()));
        }
        let mut cycle = self.cycle.lock();
        if cycle.as_ref().map_or(true, CancellationToken::is_cancelled) {
            *cycle = Some(CancellationToken::new());
        }
        Ok(())
    }

    async fn stop_updates(&self) -> Result<()> {
        if let Some(token) = self.cycle.lock().take() {
            token.cancel();
        }
        Ok(())
    }

    fn samples(&self) -> SampleStream {
        let Some(token) = self.cycle.lock().clone() else {
            return futures::stream::empty().boxed();
        };

        let track = Arc::clone(&self.track);
        let cadence = self.cadence;
        let looping = self.looping;

        futures::stream::unfold(0usize, move |index| {
            let track = Arc::clone(&track);
            async move {
                let position = if looping { index % track.len() } else { index };
                let sample = track.get(position)?;
                if index > 0 {
                    tokio::time::sleep(cadence).await;
                }
                let mut sample = sample.clone();
                sample.timestamp = Utc::now();
                debug!(index, "replaying sample");
                Some((Ok(sample), index + 1))
            }
        })
        .take_until(token.cancelled_owned())
        .boxed()
    }
}

/// Initial bearing from `from` to `to`, degrees clockwise from north.
fn bearing_degrees(from: GeoPoint, to: GeoPoint) -> f32 {
    let (lat1, lat2) = (from.latitude.to_radians(), to.latitude.to_radians());
    let delta_lng = (to.longitude - from.longitude).to_radians();
    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();
    (y.atan2(x).to_degrees().rem_euclid(360.0)) as f32
}
