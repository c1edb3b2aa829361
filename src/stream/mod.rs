//! Streaming endpoint subscriptions.
//!
//! A [`StreamSubscription`] owns one WebSocket endpoint of the controller
//! (`/traffic`, `/connections`, `/logs`, `/memory`). Once connected it keeps
//! a background task alive that
//!
//! 1. opens the socket (bounded by the connect timeout),
//! 2. decodes every message as JSON into `T` and appends it to the
//!    subscription's [`BoundedSeries`],
//! 3. on any transport failure waits the fixed reconnect interval and
//!    starts over.
//!
//! A message that fails to decode is logged and dropped; it never ends the
//! connection. Transport errors never escape the subscription.

mod state;

pub use state::{StreamState, StreamStats};

use crate::endpoint;
use crate::series::BoundedSeries;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use state::StreamCounters;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Longest message excerpt written to the log on decode failure.
const LOGGED_BODY_LIMIT: usize = 256;

/// How long a graceful close may take when disconnecting.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Tuning for a single subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Number of samples retained in the series
    pub capacity: usize,
    /// Fixed delay between a lost connection and the next attempt
    pub reconnect_interval: Duration,
    /// Upper bound on one handshake
    pub connect_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: 150,
            reconnect_interval: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Why the receive loop returned.
enum Exit {
    Cancelled,
    Lost(String),
}

struct Shared<T> {
    name: &'static str,
    url: Url,
    config: StreamConfig,
    series: BoundedSeries<T>,
    state: watch::Sender<StreamState>,
    counters: StreamCounters,
}

struct ControlTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Resilient subscription to one streaming endpoint.
pub struct StreamSubscription<T> {
    shared: Arc<Shared<T>>,
    control: Mutex<Option<ControlTask>>,
}

impl<T> StreamSubscription<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Create an idle subscription for a ready-made `ws://`/`wss://` URL.
    pub fn new(name: &'static str, url: Url, config: StreamConfig) -> Self {
        let (state, _) = watch::channel(StreamState::Idle);
        Self {
            shared: Arc::new(Shared {
                name,
                url,
                series: BoundedSeries::new(config.capacity),
                config,
                state,
                counters: StreamCounters::default(),
            }),
            control: Mutex::new(None),
        }
    }

    /// Start the background control task. No-op while it is already running.
    ///
    /// Returning does not mean the socket is open: the first handshake runs
    /// asynchronously. Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        let mut control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = control.as_ref() {
            if !task.handle.is_finished() {
                tracing::debug!(endpoint = self.shared.name, "Subscription already running");
                return;
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&self.shared).run(cancel.clone()));
        *control = Some(ControlTask { cancel, handle });
    }

    /// Cancel the control task and wait until it has stopped.
    ///
    /// After this returns the socket is closed and the series receives no
    /// further samples. No-op when not running.
    pub async fn disconnect(&self) {
        let task = self
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(task) = task else {
            return;
        };

        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            if e.is_panic() {
                tracing::error!(endpoint = self.shared.name, error = %e, "Stream task panicked");
            }
        }
        self.shared.set_state(StreamState::Idle);
        tracing::info!(endpoint = self.shared.name, "Disconnected from streaming endpoint");
    }
}

impl<T> StreamSubscription<T> {
    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub fn endpoint_url(&self) -> &Url {
        &self.shared.url
    }

    pub fn config(&self) -> &StreamConfig {
        &self.shared.config
    }

    /// Buffered samples received on this endpoint.
    pub fn series(&self) -> &BoundedSeries<T> {
        &self.shared.series
    }

    /// True while a socket is open and being read.
    pub fn connected(&self) -> bool {
        self.state() == StreamState::Streaming
    }

    pub fn state(&self) -> StreamState {
        *self.shared.state.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.shared.state.subscribe()
    }

    /// True between `connect()` and `disconnect()`.
    pub fn is_running(&self) -> bool {
        self.control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    pub fn stats(&self) -> StreamStats {
        self.shared.counters.snapshot()
    }
}

impl<T> Drop for StreamSubscription<T> {
    fn drop(&mut self) {
        let control = self.control.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = control.take() {
            task.cancel.cancel();
        }
    }
}

impl<T> Shared<T> {
    fn set_state(&self, next: StreamState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

impl<T> Shared<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let shown = endpoint::redact(&self.url);
        let retry_secs = self.config.reconnect_interval.as_secs_f64();

        loop {
            self.set_state(StreamState::Connecting);
            self.counters.connect_attempts.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(endpoint = self.name, url = %shown, "Connecting to streaming endpoint");

            let attempt = tokio::select! {
                _ = cancel.cancelled() => break,
                attempt = tokio::time::timeout(
                    self.config.connect_timeout,
                    connect_async(self.url.as_str()),
                ) => attempt,
            };

            match attempt {
                Ok(Ok((mut socket, _))) => {
                    tracing::info!(endpoint = self.name, url = %shown, "Connected to streaming endpoint");
                    self.set_state(StreamState::Streaming);

                    match self.receive(&mut socket, &cancel).await {
                        Exit::Cancelled => {
                            let _ = tokio::time::timeout(CLOSE_TIMEOUT, socket.close(None)).await;
                            break;
                        }
                        Exit::Lost(reason) => {
                            self.counters.disconnects.fetch_add(1, Ordering::Relaxed);
                            metrics::counter!("clashmon_stream_reconnects_total",
                                "endpoint" => self.name
                            )
                            .increment(1);
                            tracing::warn!(
                                endpoint = self.name,
                                url = %shown,
                                reason = %reason,
                                retry_in_seconds = retry_secs,
                                "Lost connection to streaming endpoint"
                            );
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        endpoint = self.name,
                        url = %shown,
                        error = %e,
                        retry_in_seconds = retry_secs,
                        "Failed to connect to streaming endpoint"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        endpoint = self.name,
                        url = %shown,
                        timeout_ms = self.config.connect_timeout.as_millis() as u64,
                        retry_in_seconds = retry_secs,
                        "Streaming endpoint handshake timed out"
                    );
                }
            }

            self.set_state(StreamState::Backoff);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_interval) => {}
            }
        }

        self.set_state(StreamState::Idle);
    }

    async fn receive(&self, socket: &mut Socket, cancel: &CancellationToken) -> Exit {
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Exit::Cancelled,
                next = socket.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => self.ingest(text.as_str().as_bytes()),
                Some(Ok(Message::Binary(data))) => self.ingest(&data),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("closed by peer ({})", f.code))
                        .unwrap_or_else(|| "closed by peer".to_string());
                    return Exit::Lost(reason);
                }
                // ping/pong are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => return Exit::Lost(e.to_string()),
                None => return Exit::Lost("stream ended".to_string()),
            }
        }
    }

    fn ingest(&self, raw: &[u8]) {
        match serde_json::from_slice::<T>(raw) {
            Ok(payload) => {
                self.series.push(payload);
                self.counters.messages.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("clashmon_stream_messages_total", "endpoint" => self.name)
                    .increment(1);
            }
            Err(e) => {
                self.counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("clashmon_stream_decode_errors_total", "endpoint" => self.name)
                    .increment(1);
                let excerpt = String::from_utf8_lossy(&raw[..raw.len().min(LOGGED_BODY_LIMIT)]);
                tracing::warn!(
                    endpoint = self.name,
                    error = %e,
                    body = %excerpt,
                    "Failed to decode stream message, skipping"
                );
            }
        }
    }
}
