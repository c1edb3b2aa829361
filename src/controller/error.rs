//! Error types for the controller.

use crate::api::ApiError;
use crate::endpoint::EndpointError;
use thiserror::Error;

/// Errors raised while constructing a [`Controller`](super::Controller).
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Errors raised by [`Controller::prepare`](super::Controller::prepare).
#[derive(Debug, Error)]
pub enum PrepareError {
    /// The version/capability probe failed; no stream was started.
    #[error("capability probe failed: {0}")]
    Probe(#[from] ApiError),
}
