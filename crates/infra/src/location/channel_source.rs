//! Location source fed by the embedding host.
//!
//! The platform layer (or a test, or the stdin reader in the binary) pushes
//! samples in; the tracking session reads them out through [`LocationSource`].

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use shuttlelink_core::{LocationSource, SampleStream};
use shuttlelink_domain::{LocationSample, Result, ShuttleError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

type SampleSender = mpsc::Sender<Result<LocationSample>>;
type SampleReceiver = mpsc::Receiver<Result<LocationSample>>;

#[derive(Default)]
struct Feed {
    tx: Option<SampleSender>,
    rx: Option<SampleReceiver>,
}

/// Bounded, host-driven [`LocationSource`].
pub struct ChannelLocationSource {
    capacity: usize,
    feed: Mutex<Feed>,
}

impl ChannelLocationSource {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), feed: Mutex::new(Feed::default()) }
    }

    /// Whether updates are currently started.
    pub fn is_active(&self) -> bool {
        self.feed.lock().tx.is_some()
    }

    /// Offer a sample. Returns `false` when updates are stopped or the
    /// buffer is full; the sample is dropped in both cases.
    pub fn push(&self, sample: LocationSample) -> bool {
        self.offer(Ok(sample))
    }

    /// Report a provider failure. The session stops when it reads it.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.offer(Err(ShuttleError::Location(reason.into())))
    }

    fn offer(&self, item: Result<LocationSample>) -> bool {
        let feed = self.feed.lock();
        let Some(tx) = feed.tx.as_ref() else {
            debug!("location updates stopped, sample dropped");
            return false;
        };
        match tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(capacity = self.capacity, "location buffer full, sample dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

impl Default for ChannelLocationSource {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl LocationSource for ChannelLocationSource {
    async fn start_updates(&self) -> Result<()> {
        let mut feed = self.feed.lock();
        if feed.tx.is_none() {
            let (tx, rx) = mpsc::channel(self.capacity);
            feed.tx = Some(tx);
            feed.rx = Some(rx);
        }
        Ok(())
    }

    async fn stop_updates(&self) -> Result<()> {
        let mut feed = self.feed.lock();
        feed.tx = None;
        feed.rx = None;
        Ok(())
    }

    fn samples(&self) -> SampleStream {
        match self.feed.lock().rx.take() {
            Some(rx) => {
                futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) })
                    .boxed()
            }
            None => futures::stream::empty().boxed(),
        }
    }
}
