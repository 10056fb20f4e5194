//! Latest-value-wins store for the vehicle's current location.
//!
//! Backed by a single-slot `tokio::sync::watch` channel: the writer never
//! blocks, readers always observe the most recently accepted location, and a
//! slow subscriber skips intermediate values instead of queueing them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::Stream;
use shuttlelink_domain::VehicleLocation;
use tokio::sync::watch;

/// Result of publishing a location into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Accepted,
    /// The location was older than the stored one and was discarded.
    Stale { current: DateTime<Utc> },
}

/// Shared handle to the current vehicle location.
///
/// Cloning is cheap; all clones observe the same slot. Only the tracking
/// pipeline inside this crate can publish.
#[derive(Debug, Clone)]
pub struct VehicleLocationStore {
    tx: Arc<watch::Sender<Option<VehicleLocation>>>,
}

impl Default for VehicleLocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleLocationStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the current value unless `location` is older than it.
    ///
    /// Equal timestamps are accepted.
    pub(crate) fn publish(&self, location: VehicleLocation) -> PublishOutcome {
        let mut outcome = PublishOutcome::Accepted;
        self.tx.send_if_modified(|slot| {
            if let Some(current) = slot.as_ref() {
                if location.timestamp < current.timestamp {
                    outcome = PublishOutcome::Stale { current: current.timestamp };
                    return false;
                }
            }
            *slot = Some(location);
            true
        });
        outcome
    }

    /// Most recently accepted location, if any.
    pub fn current(&self) -> Option<VehicleLocation> {
        self.tx.borrow().clone()
    }

    /// Subscribe to location changes.
    pub fn subscribe(&self) -> LocationSubscription {
        LocationSubscription { rx: self.tx.subscribe(), primed: false }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiver side of the store.
///
/// The first call to [`LocationSubscription::next`] yields the current value
/// immediately when one exists; later calls wait for the next publish.
#[derive(Debug)]
pub struct LocationSubscription {
    rx: watch::Receiver<Option<VehicleLocation>>,
    primed: bool,
}

impl LocationSubscription {
    /// Wait for the next location. Returns `None` once every store handle
    /// has been dropped.
    pub async fn next(&mut self) -> Option<VehicleLocation> {
        if !self.primed {
            self.primed = true;
            let current = self.rx.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
        }

        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let latest = self.rx.borrow_and_update().clone();
            if latest.is_some() {
                return latest;
            }
        }
    }

    /// Adapt into a `Stream` of locations.
    pub fn into_stream(self) -> impl Stream<Item = VehicleLocation> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription.next().await.map(|location| (location, subscription))
        })
    }
}
