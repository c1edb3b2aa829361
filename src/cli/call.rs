//! `version` and `call` command implementations

use crate::api::{ApiClient, ApiResponse};
use crate::cli::CallArgs;
use crate::config::ClashmonConfig;
use colored::Colorize;
use std::time::Duration;

fn api_client(config: &ClashmonConfig) -> Result<ApiClient, Box<dyn std::error::Error>> {
    Ok(ApiClient::new(
        &config.controller.url,
        config.controller.secret.clone(),
        Duration::from_secs_f64(config.controller.api_timeout_seconds),
    )?)
}

/// Split `key=value` arguments into query pairs
pub fn parse_params(params: &[String]) -> Result<Vec<(String, String)>, String> {
    params
        .iter()
        .map(|param| match param.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(format!(
                "Invalid parameter '{}', expected key=value",
                param
            )),
        })
        .collect()
}

/// Render a response body for the terminal
pub fn format_response(response: ApiResponse) -> Result<String, serde_json::Error> {
    match response {
        ApiResponse::Raw(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        other => serde_json::to_string_pretty(&other.into_json()),
    }
}

/// Handle `clashmon version` command
pub async fn handle_version(config: &ClashmonConfig) -> Result<String, Box<dyn std::error::Error>> {
    let version = api_client(config)?.version().await?;

    let flavor = if version.meta {
        "meta".cyan().to_string()
    } else {
        "premium/core".dimmed().to_string()
    };
    Ok(format!("{} ({})", version.version, flavor))
}

/// Handle `clashmon call` command
pub async fn handle_call(
    args: &CallArgs,
    config: &ClashmonConfig,
) -> Result<String, Box<dyn std::error::Error>> {
    let query = parse_params(&args.params)?;
    let response = api_client(config)?.call(&args.path, &query).await?;
    Ok(format_response(response)?)
}
