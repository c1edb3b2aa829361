//! Status command implementation

use crate::cli::output::{format_summary_json, format_summary_pretty};
use crate::cli::StatusArgs;
use crate::config::ClashmonConfig;
use crate::controller::{Controller, ControllerOptions};
use crate::lifecycle::{self, StartupError};
use crate::summary::Summary;
use std::time::Duration;

const DATA_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll until `has_data()` or `wait` elapses. Returns the final `has_data()`.
pub async fn wait_for_data(controller: &Controller, wait: Duration) -> bool {
    let poll = async {
        while !controller.has_data() {
            tokio::time::sleep(DATA_POLL_INTERVAL).await;
        }
    };
    let _ = tokio::time::timeout(wait, poll).await;
    controller.has_data()
}

/// Start a controller, collect one summary, then shut it down.
pub async fn collect_summary(
    config: &ClashmonConfig,
    wait: Duration,
) -> Result<Summary, Box<dyn std::error::Error>> {
    let controller = Controller::new(ControllerOptions::from_config(config))?;
    let timeout = Duration::from_secs(config.startup.timeout_seconds);

    match lifecycle::start(&controller, timeout).await {
        Ok(_) => {
            wait_for_data(&controller, wait).await;
        }
        // report whatever is there; the summary shows which stream is down
        Err(StartupError::Timeout(_)) => {}
        Err(e) => {
            lifecycle::shutdown(&controller).await;
            return Err(e.into());
        }
    }

    let summary = Summary::collect(&controller);
    lifecycle::shutdown(&controller).await;
    Ok(summary)
}

/// Handle `clashmon status` command
pub async fn handle_status(
    args: &StatusArgs,
    config: &ClashmonConfig,
) -> Result<String, Box<dyn std::error::Error>> {
    let summary = collect_summary(config, Duration::from_secs(args.wait)).await?;

    if args.json {
        Ok(format_summary_json(&summary)?)
    } else {
        Ok(format_summary_pretty(&summary))
    }
}
