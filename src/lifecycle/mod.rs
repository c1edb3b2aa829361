//! Startup and shutdown orchestration for a [`Controller`].

use crate::controller::{CapabilityInfo, Controller, PrepareError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Errors raised by [`start`].
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    /// Streams were started but not all of them connected in time.
    #[error("streams did not connect within {0:?}")]
    Timeout(Duration),
}

/// Prepare the controller and wait until every required stream is connected.
///
/// On [`StartupError::Timeout`] the streams keep retrying in the background;
/// call [`shutdown`] before starting again.
pub async fn start(
    controller: &Controller,
    timeout: Duration,
) -> Result<CapabilityInfo, StartupError> {
    tracing::info!(url = %controller.base_url(), "Starting controller");
    let capability = controller.prepare().await?;

    if tokio::time::timeout(timeout, controller.wait_connected())
        .await
        .is_err()
    {
        tracing::warn!(
            url = %controller.base_url(),
            timeout_ms = timeout.as_millis() as u64,
            "Streams not connected before startup timeout"
        );
        return Err(StartupError::Timeout(timeout));
    }

    tracing::info!(
        url = %controller.base_url(),
        version = %capability.version,
        "Controller connected"
    );
    Ok(capability)
}

/// Run [`start`] on a background task.
///
/// Failures are logged; the controller then reports "not connected" until
/// its streams come up on their own or it is shut down.
pub fn start_in_background(controller: Arc<Controller>, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        match start(&controller, timeout).await {
            Ok(_) => {}
            Err(StartupError::Timeout(_)) => {
                tracing::warn!("Controller running degraded, streams keep retrying");
            }
            Err(e) => {
                tracing::error!(error = %e, "Controller startup failed");
            }
        }
    })
}

/// Stop every stream of the controller.
pub async fn shutdown(controller: &Controller) {
    tracing::info!(url = %controller.base_url(), "Shutting down controller");
    controller.close().await;
}

/// Resolve on SIGINT or SIGTERM, then cancel `cancel_token`.
pub async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        _ = cancel_token.cancelled() => {}
    }

    cancel_token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerOptions;

    fn unreachable_controller() -> Controller {
        let mut options = ControllerOptions::new("http://127.0.0.1:9");
        options.api_timeout = Duration::from_millis(500);
        Controller::new(options).unwrap()
    }

    #[tokio::test]
    async fn test_start_fails_when_probe_fails() {
        let controller = unreachable_controller();
        let result = start(&controller, Duration::from_millis(100)).await;

        assert!(matches!(result, Err(StartupError::Prepare(_))));
        assert!(!controller.is_prepared());
        assert!(!controller.traffic().is_running());
    }

    #[tokio::test]
    async fn test_background_start_does_not_propagate_failure() {
        let controller = Arc::new(unreachable_controller());
        let handle = start_in_background(controller.clone(), Duration::from_millis(100));

        handle.await.unwrap();
        assert!(!controller.connected());
    }

    #[tokio::test]
    async fn test_shutdown_signal_returns_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), shutdown_signal(token.clone()))
            .await
            .expect("shutdown_signal should return once cancelled");
        assert!(token.is_cancelled());
    }
}
