//! Per-subscription connection state and counters.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle of a streaming subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    /// No control task is running.
    #[default]
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Socket open, receiving messages.
    Streaming,
    /// Connection lost, waiting out the reconnect interval.
    Backoff,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamState::Idle => "idle",
            StreamState::Connecting => "connecting",
            StreamState::Streaming => "streaming",
            StreamState::Backoff => "backoff",
        };
        f.write_str(s)
    }
}

/// Lifetime counters, shared between the control task and readers.
#[derive(Debug, Default)]
pub(crate) struct StreamCounters {
    pub messages: AtomicU64,
    pub decode_errors: AtomicU64,
    pub connect_attempts: AtomicU64,
    pub disconnects: AtomicU64,
}

impl StreamCounters {
    pub fn snapshot(&self) -> StreamStats {
        StreamStats {
            messages: self.messages.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct StreamStats {
    /// Messages decoded and appended
    pub messages: u64,
    /// Messages dropped because they failed to decode
    pub decode_errors: u64,
    /// Handshakes attempted, successful or not
    pub connect_attempts: u64,
    /// Established connections that were later lost
    pub disconnects: u64,
}
