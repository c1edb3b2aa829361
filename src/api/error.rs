//! Error types for one-shot control API calls.

use thiserror::Error;

/// A body on a known-shape path did not match that shape.
#[derive(Debug, Error)]
#[error("failed to decode '{path}' response: {source}")]
pub struct DecodeError {
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}

/// Errors returned by [`ApiClient::call`](super::ApiClient::call).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The daemon answered with a non-2xx status.
    #[error("controller returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The daemon answered 2xx with no body.
    #[error("controller returned an empty response")]
    EmptyResponse,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// DNS failure, refused connection, broken transfer.
    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout after {0}ms")]
    Timeout(u64),
}

impl ApiError {
    /// HTTP status for [`ApiError::Status`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
