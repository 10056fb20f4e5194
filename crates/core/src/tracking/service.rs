//! Live tracking session - core business logic
//!
//! A session subscribes to a [`LocationSource`], turns every sample into a
//! [`VehicleLocation`], publishes it into the [`VehicleLocationStore`] and
//! hands the accepted location to a serialized forward task. Publishing never
//! waits on the network: forwards go through a bounded queue and a full queue
//! drops the location for forwarding only.
//!
//! Both background tasks are scoped to a cancellation token created per
//! start. Stopping cancels the token, joins the tasks within
//! `join_timeout` and aborts anything still running after that. When the
//! source fails or ends, the ingestion task releases the source and the
//! realtime channel itself; a later stop does not release them twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use shuttlelink_domain::constants::{DEFAULT_FORWARD_QUEUE_CAPACITY, DEFAULT_JOIN_TIMEOUT_MS};
use shuttlelink_domain::{
    LocationSample, ShuttleError, TrackingConfig, TrackingState, VehicleLocation,
};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::forwarder::{ForwardError, StreamForwarder};
use super::ports::{LocationSource, SampleStream, SessionContextProvider};
use super::stats::{PipelineSnapshot, PipelineStats};
use super::store::{PublishOutcome, VehicleLocationStore};

const NOTICE_CAPACITY: usize = 16;

/// Errors surfaced by the tracking session.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackingError {
    #[error("location source failed: {0}")]
    Source(ShuttleError),

    #[error("session context unavailable: {0}")]
    Context(ShuttleError),

    #[error("sample at {sample} is older than current location at {current}")]
    Stale { sample: DateTime<Utc>, current: DateTime<Utc> },
}

impl From<TrackingError> for ShuttleError {
    fn from(err: TrackingError) -> Self {
        match err {
            TrackingError::Source(inner) | TrackingError::Context(inner) => inner,
            stale @ TrackingError::Stale { .. } => ShuttleError::InvalidInput(stale.to_string()),
        }
    }
}

/// Non-fatal events the host UI may want to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingNotice {
    /// The source reported an error; the session has stopped.
    SourceFailed(String),
    /// The source has no more samples; the session has stopped.
    SourceEnded,
}

/// Result of [`TrackingSession::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Tunables for a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingOptions {
    pub forward_queue_capacity: usize,
    pub join_timeout: Duration,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            forward_queue_capacity: DEFAULT_FORWARD_QUEUE_CAPACITY,
            join_timeout: Duration::from_millis(DEFAULT_JOIN_TIMEOUT_MS),
        }
    }
}

impl From<&TrackingConfig> for TrackingOptions {
    fn from(config: &TrackingConfig) -> Self {
        Self {
            forward_queue_capacity: config.forward_queue_capacity,
            join_timeout: Duration::from_millis(config.join_timeout_ms),
        }
    }
}

/// Sample → location → store → forward queue. Shared by the ingestion task
/// and the manual update path so there is a single writer.
struct Pipeline {
    context: Arc<dyn SessionContextProvider>,
    store: VehicleLocationStore,
    stats: Arc<PipelineStats>,
    writer: Mutex<()>,
}

impl Pipeline {
    async fn process(
        &self,
        sample: LocationSample,
        forward: Option<&mpsc::Sender<VehicleLocation>>,
    ) -> Result<VehicleLocation, TrackingError> {
        let _guard = self.writer.lock().await;
        self.stats.record_sample();

        let context = self.context.current().await.map_err(|err| {
            self.stats.record_context_failure();
            TrackingError::Context(err)
        })?;

        let location = VehicleLocation::from_sample(&sample, &context);
        if let PublishOutcome::Stale { current } = self.store.publish(location.clone()) {
            self.stats.record_stale();
            return Err(TrackingError::Stale { sample: location.timestamp, current });
        }
        self.stats.record_published();

        if let Some(tx) = forward {
            match tx.try_send(location.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(dropped)) => {
                    self.stats.record_forward_dropped();
                    warn!(location_id = %dropped.id, "Forward queue full; location not forwarded");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Forward queue closed; session is stopping");
                }
            }
        }

        Ok(location)
    }
}

/// Source and channel teardown for one started session. Runs at most once,
/// from whichever of `stop` or the ingestion task gets there first.
struct Release {
    source: Arc<dyn LocationSource>,
    forwarder: Arc<StreamForwarder>,
    done: AtomicBool,
}

impl Release {
    async fn run(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.source.stop_updates().await {
            warn!(error = %err, "Failed to stop location updates");
        }
        if let Err(err) = self.forwarder.disconnect().await {
            warn!(error = %err, "Failed to close realtime channel");
        }
    }
}

struct SessionHandle {
    cancel: CancellationToken,
    release: Arc<Release>,
    ingestion: JoinHandle<()>,
    forwarding: JoinHandle<()>,
}

/// One vehicle's live tracking session.
pub struct TrackingSession {
    source: Arc<dyn LocationSource>,
    forwarder: Arc<StreamForwarder>,
    pipeline: Arc<Pipeline>,
    options: TrackingOptions,
    session: Mutex<Option<SessionHandle>>,
    forward_tx: RwLock<Option<mpsc::Sender<VehicleLocation>>>,
    state_tx: Arc<watch::Sender<TrackingState>>,
    notices: broadcast::Sender<TrackingNotice>,
}

impl TrackingSession {
    pub fn new(
        source: Arc<dyn LocationSource>,
        context: Arc<dyn SessionContextProvider>,
        forwarder: Arc<StreamForwarder>,
        store: VehicleLocationStore,
        options: TrackingOptions,
    ) -> Self {
        let (state_tx, _) = watch::channel(TrackingState::Idle);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            source,
            forwarder,
            pipeline: Arc::new(Pipeline {
                context,
                store,
                stats: Arc::new(PipelineStats::default()),
                writer: Mutex::new(()),
            }),
            options,
            session: Mutex::new(None),
            forward_tx: RwLock::new(None),
            state_tx: Arc::new(state_tx),
            notices,
        }
    }

    /// Begin tracking. Calling it again while running is a no-op.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<StartOutcome, TrackingError> {
        let mut session = self.session.lock().await;

        if let Some(handle) = session.as_ref() {
            if !handle.cancel.is_cancelled() {
                debug!("Tracking already running");
                return Ok(StartOutcome::AlreadyRunning);
            }
        }
        // The previous session ended on its own; release it before restarting.
        if let Some(finished) = session.take() {
            self.shutdown(finished).await;
        }

        self.source.start_updates().await.map_err(TrackingError::Source)?;

        if let Err(err) = self.forwarder.connect().await {
            warn!(error = %err, "Realtime channel unavailable; tracking continues locally");
        }

        let cancel = CancellationToken::new();
        let release = Arc::new(Release {
            source: Arc::clone(&self.source),
            forwarder: Arc::clone(&self.forwarder),
            done: AtomicBool::new(false),
        });
        let capacity = self.options.forward_queue_capacity.max(1);
        let (forward_tx, forward_rx) = mpsc::channel(capacity);

        self.state_tx.send_replace(TrackingState::Running);

        let ingestion = tokio::spawn(run_ingestion(
            Arc::clone(&self.pipeline),
            self.source.samples(),
            forward_tx.clone(),
            cancel.clone(),
            Arc::clone(&release),
            Arc::clone(&self.state_tx),
            self.notices.clone(),
        ));
        let forwarding = tokio::spawn(run_forwarding(
            Arc::clone(&self.forwarder),
            forward_rx,
            cancel.clone(),
            Arc::clone(&self.pipeline.stats),
        ));

        *self.forward_tx.write().await = Some(forward_tx);
        *session = Some(SessionHandle { cancel, release, ingestion, forwarding });

        info!(queue_capacity = capacity, "Tracking started");
        Ok(StartOutcome::Started)
    }

    /// Stop tracking. Safe to call when idle or repeatedly.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        match session.take() {
            Some(handle) => {
                self.shutdown(handle).await;
                info!("Tracking stopped");
            }
            None => debug!("Stop requested while idle"),
        }
    }

    /// Push one sample through the pipeline outside of the source stream.
    ///
    /// The location is always published; it is forwarded only while a
    /// session is running.
    pub async fn submit_sample(
        &self,
        sample: LocationSample,
    ) -> Result<VehicleLocation, TrackingError> {
        let forward_tx = self.forward_tx.read().await.clone();
        self.pipeline.process(sample, forward_tx.as_ref()).await
    }

    pub fn state(&self) -> TrackingState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TrackingState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<TrackingNotice> {
        self.notices.subscribe()
    }

    pub fn stats(&self) -> PipelineSnapshot {
        self.pipeline.stats.snapshot()
    }

    pub fn store(&self) -> &VehicleLocationStore {
        &self.pipeline.store
    }

    async fn shutdown(&self, handle: SessionHandle) {
        let SessionHandle { cancel, release, ingestion, forwarding } = handle;
        cancel.cancel();
        self.forward_tx.write().await.take();

        join_task(ingestion, self.options.join_timeout, "ingestion").await;
        join_task(forwarding, self.options.join_timeout, "forwarding").await;

        release.run().await;

        self.state_tx.send_replace(TrackingState::Idle);
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        if let Some(handle) = self.session.get_mut() {
            handle.cancel.cancel();
        }
    }
}

async fn join_task(mut handle: JoinHandle<()>, timeout: Duration, task: &'static str) {
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) if err.is_panic() => error!(task, "Tracking task panicked"),
        Ok(Err(_)) => debug!(task, "Tracking task was cancelled"),
        Err(_) => {
            warn!(task, timeout_ms = timeout.as_millis() as u64, "Tracking task overran join timeout; aborting");
            handle.abort();
        }
    }
}

async fn run_ingestion(
    pipeline: Arc<Pipeline>,
    mut samples: SampleStream,
    forward_tx: mpsc::Sender<VehicleLocation>,
    cancel: CancellationToken,
    release: Arc<Release>,
    state_tx: Arc<watch::Sender<TrackingState>>,
    notices: broadcast::Sender<TrackingNotice>,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Ingestion loop cancelled");
                break;
            }
            item = samples.next() => {
                let notice = match item {
                    Some(Ok(sample)) => {
                        if let Err(err) = pipeline.process(sample, Some(&forward_tx)).await {
                            warn!(error = %err, "Sample skipped");
                        }
                        continue;
                    }
                    Some(Err(err)) => {
                        error!(error = %err, "Location source failed; stopping session");
                        TrackingNotice::SourceFailed(err.to_string())
                    }
                    None => {
                        info!("Location source ended; stopping session");
                        TrackingNotice::SourceEnded
                    }
                };

                cancel.cancel();
                release.run().await;
                state_tx.send_replace(TrackingState::Idle);
                // No receivers is fine; the notice is informational.
                let _ = notices.send(notice);
                break;
            }
        }
    }
}

async fn run_forwarding(
    forwarder: Arc<StreamForwarder>,
    mut queue: mpsc::Receiver<VehicleLocation>,
    cancel: CancellationToken,
    stats: Arc<PipelineStats>,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Forward loop cancelled");
                break;
            }
            next = queue.recv() => {
                let Some(location) = next else { break };
                let result = forwarder.send(&location).await;
                if matches!(result, Err(ForwardError::NotConnected)) {
                    debug!(location_id = %location.id, "Realtime channel not connected; location not forwarded");
                }
                stats.record_forward(result.is_ok());
            }
        }
    }
}
