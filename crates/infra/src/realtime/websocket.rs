//! WebSocket implementation of the realtime channel port.
//!
//! The channel owns at most one connection. A background reader drains
//! inbound frames so control frames are answered, republishes text frames to
//! subscribers and marks the connection dead when the peer goes away. A send
//! that fails tears the connection down; the next `connect` opens a new one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use shuttlelink_core::RealtimeChannel;
use shuttlelink_domain::constants::MAX_RECONNECT_BACKOFF_SECS;
use shuttlelink_domain::{RealtimeConfig, Result, ShuttleError, VehicleLocation};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::message::{realtime_url, LocationMessage};
use crate::errors::InfraError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const INBOUND_BUFFER: usize = 64;

struct Connection {
    sink: SplitSink<WsStream, Message>,
    reader: CancellationToken,
}

pub struct WebSocketChannel {
    url: String,
    max_connect_attempts: u32,
    backoff_unit: Duration,
    connection: Mutex<Option<Connection>>,
    /// Generation of the live connection, 0 when there is none.
    active: Arc<AtomicU64>,
    generations: AtomicU64,
    inbound: broadcast::Sender<String>,
}

impl WebSocketChannel {
    pub fn new(url: impl Into<String>, max_connect_attempts: u32) -> Self {
        let (inbound, _) = broadcast::channel(INBOUND_BUFFER);
        Self {
            url: url.into(),
            max_connect_attempts: max_connect_attempts.max(1),
            backoff_unit: Duration::from_secs(1),
            connection: Mutex::new(None),
            active: Arc::new(AtomicU64::new(0)),
            generations: AtomicU64::new(0),
            inbound,
        }
    }

    pub fn from_config(config: &RealtimeConfig) -> Result<Self> {
        Ok(Self::new(realtime_url(&config.base_url)?, config.max_connect_attempts))
    }

    /// Scale the reconnect backoff. Delays are `unit * min(30, 2^attempt)`.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Text frames received from the server.
    pub fn subscribe_messages(&self) -> broadcast::Receiver<String> {
        self.inbound.subscribe()
    }

    fn backoff_delay(&self, retry: u32) -> Duration {
        let secs = 1u64.checked_shl(retry).unwrap_or(u64::MAX).min(MAX_RECONNECT_BACKOFF_SECS);
        self.backoff_unit.saturating_mul(secs as u32)
    }

    fn spawn_reader(
        &self,
        mut stream: futures::stream::SplitStream<WsStream>,
        generation: u64,
    ) -> CancellationToken {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let active = Arc::clone(&self.active);
        let inbound = self.inbound.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    frame = stream.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            let _ = inbound.send(text);
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(generation, ?frame, "websocket closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(generation, error = %err, "websocket read failed");
                            break;
                        }
                        None => break,
                    },
                }
            }
            let _ = active.compare_exchange(generation, 0, Ordering::SeqCst, Ordering::SeqCst);
        });

        token
    }

    async fn open(&self) -> Result<Connection> {
        let mut last_error = None;

        for attempt in 0..self.max_connect_attempts {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt - 1);
                debug!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "retrying websocket connect");
                tokio::time::sleep(delay).await;
            }

            match connect_async(self.url.as_str()).await {
                Ok((stream, _response)) => {
                    let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
                    let (sink, reader) = stream.split();
                    let reader = self.spawn_reader(reader, generation);
                    self.active.store(generation, Ordering::SeqCst);
                    info!(url = %self.url, attempt = attempt + 1, "websocket connected");
                    return Ok(Connection { sink, reader });
                }
                Err(err) => {
                    warn!(url = %self.url, attempt = attempt + 1, error = %err, "websocket connect failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .map(|err| ShuttleError::from(InfraError::from(err)))
            .unwrap_or_else(|| ShuttleError::Network("websocket connect was not attempted".into())))
    }

    async fn close(&self, connection: Option<Connection>) {
        self.active.store(0, Ordering::SeqCst);
        if let Some(mut connection) = connection {
            connection.reader.cancel();
            if let Err(err) = connection.sink.close().await {
                debug!(error = %err, "websocket close handshake failed");
            }
        }
    }
}

#[async_trait]
impl RealtimeChannel for WebSocketChannel {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        if guard.is_some() && self.is_connected() {
            return Ok(());
        }

        let stale = guard.take();
        self.close(stale).await;
        *guard = Some(self.open().await?);
        Ok(())
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn disconnect(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        let connection = guard.take();
        if connection.is_some() {
            info!("websocket disconnected");
        }
        self.close(connection).await;
        Ok(())
    }

    async fn send(&self, location: &VehicleLocation) -> Result<()> {
        let payload = serde_json::to_string(&LocationMessage::from(location))?;

        let mut guard = self.connection.lock().await;
        let Some(connection) = guard.as_mut().filter(|_| self.is_connected()) else {
            let stale = guard.take();
            self.close(stale).await;
            return Err(ShuttleError::Network("websocket is not connected".into()));
        };

        match connection.sink.send(Message::Text(payload)).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(location_id = %location.id, error = %err, "websocket send failed, dropping connection");
                let broken = guard.take();
                self.close(broken).await;
                Err(InfraError::from(err).into())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.active.load(Ordering::SeqCst) != 0
    }
}
