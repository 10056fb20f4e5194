//! Best-effort forwarding of vehicle locations to the realtime backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shuttlelink_domain::VehicleLocation;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::ports::RealtimeChannel;

/// Why a single forward did not reach the backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForwardError {
    #[error("realtime channel is not connected")]
    NotConnected,

    #[error("realtime transport failed: {0}")]
    Transport(String),

    #[error("forward timed out after {0:?}")]
    Timeout(Duration),
}

/// Wraps a [`RealtimeChannel`] with idempotent connect/disconnect and a
/// bounded send.
///
/// Once [`connect`](Self::connect) has been requested, a send that finds the
/// transport dropped reopens it before sending. Failed sends are not retried.
pub struct StreamForwarder {
    channel: Arc<dyn RealtimeChannel>,
    send_timeout: Duration,
    wanted: AtomicBool,
    lifecycle: Mutex<()>,
}

impl StreamForwarder {
    pub fn new(channel: Arc<dyn RealtimeChannel>, send_timeout: Duration) -> Self {
        Self { channel, send_timeout, wanted: AtomicBool::new(false), lifecycle: Mutex::new(()) }
    }

    /// Open the channel. No-op when already connected.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<(), ForwardError> {
        let _guard = self.lifecycle.lock().await;
        if self.wanted.load(Ordering::Acquire) && self.channel.is_connected() {
            debug!("Realtime channel already connected");
            return Ok(());
        }

        self.wanted.store(true, Ordering::Release);
        self.channel.connect().await.map_err(|err| ForwardError::Transport(err.to_string()))?;
        info!("Realtime channel connected");
        Ok(())
    }

    /// Close the channel. Safe to call when never connected.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<(), ForwardError> {
        let _guard = self.lifecycle.lock().await;
        if !self.wanted.swap(false, Ordering::AcqRel) {
            debug!("Realtime channel not connected; nothing to close");
            return Ok(());
        }

        self.channel.disconnect().await.map_err(|err| ForwardError::Transport(err.to_string()))?;
        info!("Realtime channel disconnected");
        Ok(())
    }

    /// Whether a connection has been requested and not released.
    pub fn is_connected(&self) -> bool {
        self.wanted.load(Ordering::Acquire)
    }

    /// Send one location, bounded by the configured send timeout.
    pub async fn send(&self, location: &VehicleLocation) -> Result<(), ForwardError> {
        if !self.wanted.load(Ordering::Acquire) {
            return Err(ForwardError::NotConnected);
        }

        let attempt = async {
            if !self.channel.is_connected() {
                debug!("Realtime channel dropped; reopening before send");
                self.channel.connect().await?;
            }
            self.channel.send(location).await
        };

        match tokio::time::timeout(self.send_timeout, attempt).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                warn!(location_id = %location.id, error = %err, "Forward failed");
                Err(ForwardError::Transport(err.to_string()))
            }
            Err(_) => {
                warn!(location_id = %location.id, timeout_ms = self.send_timeout.as_millis() as u64, "Forward timed out");
                Err(ForwardError::Timeout(self.send_timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::Utc;
    use shuttlelink_domain::{GeoPoint, LocationSample, Result, SessionContext, ShuttleError};

    use super::*;

    #[derive(Default)]
    struct CountingChannel {
        open: AtomicBool,
        connects: AtomicUsize,
        disconnects: AtomicUsize,
        sent: AtomicUsize,
        fail_sends: AtomicBool,
        stall: AtomicBool,
    }

    #[async_trait]
    impl RealtimeChannel for CountingChannel {
        async fn connect(&self) -> Result<()> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.open.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn send(&self, _location: &VehicleLocation) -> Result<()> {
            if self.stall.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            if self.fail_sends.load(Ordering::SeqCst) {
                self.open.store(false, Ordering::SeqCst);
                return Err(ShuttleError::Network("socket closed".into()));
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }
    }

    fn location() -> VehicleLocation {
        let sample = LocationSample::new(GeoPoint::new(41.0, 29.0), 0.0, 0.0, Utc::now());
        VehicleLocation::from_sample(&sample, &SessionContext::new("r", "d"))
    }

    fn forwarder(channel: &Arc<CountingChannel>) -> StreamForwarder {
        StreamForwarder::new(channel.clone(), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let channel = Arc::new(CountingChannel::default());
        let fwd = forwarder(&channel);

        fwd.connect().await.unwrap();
        fwd.connect().await.unwrap();

        assert_eq!(channel.connects.load(Ordering::SeqCst), 1);
        assert!(fwd.is_connected());
    }

    #[tokio::test]
    async fn disconnect_without_connect_is_noop() {
        let channel = Arc::new(CountingChannel::default());
        let fwd = forwarder(&channel);

        fwd.disconnect().await.unwrap();
        fwd.disconnect().await.unwrap();

        assert_eq!(channel.disconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_before_connect_reports_not_connected() {
        let channel = Arc::new(CountingChannel::default());
        let fwd = forwarder(&channel);

        assert_eq!(fwd.send(&location()).await, Err(ForwardError::NotConnected));
    }

    #[tokio::test]
    async fn send_reopens_dropped_transport() {
        let channel = Arc::new(CountingChannel::default());
        let fwd = forwarder(&channel);
        fwd.connect().await.unwrap();

        channel.fail_sends.store(true, Ordering::SeqCst);
        assert!(matches!(fwd.send(&location()).await, Err(ForwardError::Transport(_))));

        channel.fail_sends.store(false, Ordering::SeqCst);
        fwd.send(&location()).await.unwrap();

        assert_eq!(channel.connects.load(Ordering::SeqCst), 2);
        assert_eq!(channel.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stalled_send_times_out() {
        let channel = Arc::new(CountingChannel::default());
        let fwd = forwarder(&channel);
        fwd.connect().await.unwrap();
        channel.stall.store(true, Ordering::SeqCst);

        let result = fwd.send(&location()).await;

        assert_eq!(result, Err(ForwardError::Timeout(Duration::from_millis(100))));
    }
}
