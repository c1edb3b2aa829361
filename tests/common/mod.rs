//! Shared test utilities for clashmon integration tests.
//!
//! Provides an in-process mock Clash controller: `GET /version` plus the
//! four WebSocket streams, each pushing one JSON message per tick.

#![allow(dead_code)]

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use clashmon::controller::{Controller, ControllerOptions};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

// =============================================================================
// Mock Controller
// =============================================================================

/// Behaviour of a [`MockClash`] instance.
#[derive(Debug, Clone)]
pub struct MockClashOptions {
    pub version: String,
    pub meta: bool,
    /// Status returned by `/version`; anything but 200 returns a plain body
    pub version_status: u16,
    /// Delay between two stream messages
    pub tick: Duration,
    /// Close the first connection of every stream after this many messages
    pub close_first_after: Option<usize>,
    /// Send one undecodable message before the real ones
    pub send_garbage_first: bool,
}

impl Default for MockClashOptions {
    fn default() -> Self {
        Self {
            version: "v1.18.0".to_string(),
            meta: false,
            version_status: 200,
            tick: Duration::from_millis(20),
            close_first_after: None,
            send_garbage_first: false,
        }
    }
}

/// One accepted WebSocket upgrade.
#[derive(Debug, Clone)]
pub struct Upgrade {
    pub stream: &'static str,
    pub query: HashMap<String, String>,
}

struct MockState {
    options: MockClashOptions,
    meta: AtomicBool,
    version_requests: AtomicUsize,
    upgrades: Mutex<Vec<Upgrade>>,
}

/// Running mock controller, torn down with the test runtime.
pub struct MockClash {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockClash {
    pub async fn start(options: MockClashOptions) -> Self {
        let state = Arc::new(MockState {
            meta: AtomicBool::new(options.meta),
            options,
            version_requests: AtomicUsize::new(0),
            upgrades: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/version", get(version_handler))
            .route("/traffic", stream_route("traffic"))
            .route("/connections", stream_route("connections"))
            .route("/logs", stream_route("logs"))
            .route("/memory", stream_route("memory"))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub async fn start_default() -> Self {
        Self::start(MockClashOptions::default()).await
    }

    /// Change the `meta` flag reported by later `/version` requests.
    pub fn set_meta(&self, meta: bool) {
        self.state.meta.store(meta, Ordering::SeqCst);
    }

    pub fn version_requests(&self) -> usize {
        self.state.version_requests.load(Ordering::SeqCst)
    }

    /// Upgrades accepted on `stream`, in arrival order.
    pub fn upgrades(&self, stream: &str) -> Vec<Upgrade> {
        self.state
            .upgrades
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.stream == stream)
            .cloned()
            .collect()
    }

    pub fn options(&self) -> ControllerOptions {
        let mut options = ControllerOptions::new(self.base_url.clone());
        options.api_timeout = Duration::from_secs(2);
        options.reconnect_interval = Duration::from_millis(100);
        options.connect_timeout = Duration::from_secs(2);
        options
    }

    pub fn controller(&self) -> Controller {
        Controller::new(self.options()).unwrap()
    }
}

async fn version_handler(State(state): State<Arc<MockState>>) -> Response {
    state.version_requests.fetch_add(1, Ordering::SeqCst);
    let options = &state.options;

    if options.version_status != 200 {
        let status =
            StatusCode::from_u16(options.version_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "controller error").into_response();
    }

    Json(serde_json::json!({
        "version": options.version,
        "meta": state.meta.load(Ordering::SeqCst),
    }))
    .into_response()
}

fn stream_route(stream: &'static str) -> MethodRouter<Arc<MockState>> {
    get(
        move |ws: WebSocketUpgrade,
              query: Query<HashMap<String, String>>,
              state: State<Arc<MockState>>| stream_handler(ws, query, state, stream),
    )
}

async fn stream_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<Arc<MockState>>,
    stream: &'static str,
) -> Response {
    let first = {
        let mut upgrades = state.upgrades.lock().unwrap();
        let first = !upgrades.iter().any(|u| u.stream == stream);
        upgrades.push(Upgrade { stream, query });
        first
    };

    let close_after = if first {
        state.options.close_first_after
    } else {
        None
    };
    let options = state.options.clone();

    ws.on_upgrade(move |socket| push_messages(socket, stream, options, close_after))
}

async fn push_messages(
    mut socket: WebSocket,
    stream: &'static str,
    options: MockClashOptions,
    close_after: Option<usize>,
) {
    if options.send_garbage_first
        && socket
            .send(Message::Text("{not json".to_string().into()))
            .await
            .is_err()
    {
        return;
    }

    let mut sent = 0usize;
    loop {
        let payload = sample(stream, sent as u64).to_string();
        if socket.send(Message::Text(payload.into())).await.is_err() {
            return;
        }
        sent += 1;

        if close_after == Some(sent) {
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
        tokio::time::sleep(options.tick).await;
    }
}

/// The `n`-th message of `stream` on one connection.
pub fn sample(stream: &str, n: u64) -> serde_json::Value {
    match stream {
        "traffic" => serde_json::json!({ "up": n, "down": n * 10 }),
        "connections" => serde_json::json!({
            "downloadTotal": n * 100,
            "uploadTotal": n * 10,
            "connections": null,
        }),
        "logs" => serde_json::json!({ "type": "info", "payload": format!("line {n}") }),
        "memory" => serde_json::json!({ "inuse": 1024 + n, "oslimit": 0 }),
        _ => serde_json::Value::Null,
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// `http://` URL of a port nothing listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let poll = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.is_ok()
}

/// Run `future` with a generous upper bound so a hang fails the test.
pub async fn bounded<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("operation timed out")
}
