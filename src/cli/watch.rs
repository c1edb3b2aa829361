//! Watch command implementation

use crate::cli::output::{format_summary_pretty, readiness_line};
use crate::cli::WatchArgs;
use crate::config::ClashmonConfig;
use crate::controller::{Controller, ControllerOptions};
use crate::lifecycle::{self, StartupError};
use crate::summary::Summary;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn render(summary: &Summary, json: bool) -> Result<String, serde_json::Error> {
    if json {
        // one object per line
        serde_json::to_string(summary)
    } else if summary.readiness.is_ready() {
        Ok(format_summary_pretty(summary))
    } else {
        Ok(readiness_line(summary.readiness))
    }
}

/// Main watch command handler
pub async fn run_watch(
    args: WatchArgs,
    config: ClashmonConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = Arc::new(Controller::new(ControllerOptions::from_config(&config))?);
    let timeout = Duration::from_secs(config.startup.timeout_seconds);
    let cancel_token = CancellationToken::new();

    // 1. Start streams, blocking or in the background
    let startup_handle = if config.startup.wait_for_connection {
        match lifecycle::start(&controller, timeout).await {
            Ok(_) | Err(StartupError::Timeout(_)) => None,
            Err(e) => {
                lifecycle::shutdown(&controller).await;
                return Err(e.into());
            }
        }
    } else {
        Some(lifecycle::start_in_background(controller.clone(), timeout))
    };

    // 2. Print until interrupted
    let signal_handle = tokio::spawn(lifecycle::shutdown_signal(cancel_token.clone()));
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                let summary = Summary::collect(&controller);
                match render(&summary, args.json) {
                    Ok(text) => println!("{}", text),
                    Err(e) => tracing::error!(error = %e, "Failed to render summary"),
                }
            }
        }
    }

    // 3. Cleanup
    if let Some(handle) = startup_handle {
        handle.abort();
        let _ = handle.await;
    }
    signal_handle.await?;
    lifecycle::shutdown(&controller).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_not_ready_is_single_line() {
        let controller = Controller::new(ControllerOptions::new("http://127.0.0.1:9")).unwrap();
        let summary = Summary::collect(&controller);

        let text = render(&summary, false).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("not established"));
    }

    #[test]
    fn test_render_json_is_one_line() {
        let controller = Controller::new(ControllerOptions::new("http://127.0.0.1:9")).unwrap();
        let summary = Summary::collect(&controller);

        let text = render(&summary, true).unwrap();
        assert!(!text.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["connected"], false);
    }

    #[tokio::test]
    async fn test_watch_fails_fast_when_probe_fails() {
        let mut config = ClashmonConfig::default();
        config.controller.url = "http://127.0.0.1:9".to_string();
        config.controller.api_timeout_seconds = 0.5;

        let args = WatchArgs {
            interval: 1,
            json: false,
        };
        assert!(run_watch(args, config).await.is_err());
    }
}
