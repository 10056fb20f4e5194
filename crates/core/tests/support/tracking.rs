//! Fakes for the tracking ports.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use shuttlelink_core::{LocationSource, RealtimeChannel, SampleStream, SessionContextProvider};
use shuttlelink_domain::{
    GeoPoint, LocationSample, Result, SessionContext, ShuttleError, VehicleLocation,
};
use tokio::sync::mpsc;

use super::at;

/// Sample at `base_time() + secs` near the campus.
pub fn sample_at(secs: i64) -> LocationSample {
    let offset = secs as f64 * 0.0001;
    LocationSample::new(GeoPoint::new(41.0082 + offset, 28.9784 + offset), 45.0, 8.0, at(secs))
}

type SampleSender = mpsc::UnboundedSender<Result<LocationSample>>;
type SampleReceiver = mpsc::UnboundedReceiver<Result<LocationSample>>;

/// Host-driven source: tests push samples, failures or end-of-stream.
#[derive(Default)]
pub struct FakeLocationSource {
    tx: Mutex<Option<SampleSender>>,
    rx: Mutex<Option<SampleReceiver>>,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl FakeLocationSource {
    /// Deliver a sample. Returns false when updates are stopped.
    pub fn push(&self, sample: LocationSample) -> bool {
        self.tx.lock().unwrap().as_ref().is_some_and(|tx| tx.send(Ok(sample)).is_ok())
    }

    pub fn fail(&self, message: &str) -> bool {
        self.tx
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| tx.send(Err(ShuttleError::Location(message.into()))).is_ok())
    }

    /// End the stream without an error.
    pub fn end(&self) {
        self.tx.lock().unwrap().take();
    }
}

#[async_trait]
impl LocationSource for FakeLocationSource {
    async fn start_updates(&self) -> Result<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.tx.lock().unwrap() = Some(tx);
        *self.rx.lock().unwrap() = Some(rx);
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_updates(&self) -> Result<()> {
        self.tx.lock().unwrap().take();
        self.rx.lock().unwrap().take();
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn samples(&self) -> SampleStream {
        match self.rx.lock().unwrap().take() {
            Some(rx) => futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed(),
            None => futures::stream::empty().boxed(),
        }
    }
}

/// Records every location it is asked to send.
#[derive(Default)]
pub struct FakeChannel {
    open: AtomicBool,
    pub refuse_connect: AtomicBool,
    pub fail_sends: AtomicBool,
    pub send_delay_ms: AtomicUsize,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    sent: Mutex<Vec<VehicleLocation>>,
}

impl FakeChannel {
    pub fn sent(&self) -> Vec<VehicleLocation> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl RealtimeChannel for FakeChannel {
    async fn connect(&self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse_connect.load(Ordering::SeqCst) {
            return Err(ShuttleError::Network("connection refused".into()));
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, location: &VehicleLocation) -> Result<()> {
        let delay = self.send_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ShuttleError::Network("broken pipe".into()));
        }
        self.sent.lock().unwrap().push(location.clone());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Context provider that can be switched into a failing mode.
pub struct FixedContext {
    context: SessionContext,
    pub failing: AtomicBool,
}

impl FixedContext {
    pub fn new(route_id: &str, driver_id: &str) -> Self {
        Self { context: SessionContext::new(route_id, driver_id), failing: AtomicBool::new(false) }
    }
}

#[async_trait]
impl SessionContextProvider for FixedContext {
    async fn current(&self) -> Result<SessionContext> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShuttleError::NotFound("no active route".into()));
        }
        Ok(self.context.clone())
    }
}
