//! Configuration module for clashmon
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`CLASHMON_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use clashmon::config::ClashmonConfig;
//!
//! let config = ClashmonConfig::default();
//! assert_eq!(config.controller.url, "http://127.0.0.1:9090");
//!
//! let toml = r#"
//! [controller]
//! url = "http://192.168.1.1:9090"
//! secret = "s3cret"
//! "#;
//! let config: ClashmonConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.controller.secret.as_deref(), Some("s3cret"));
//! ```

pub mod controller;
pub mod error;
pub mod logging;
pub mod startup;
pub mod streams;

pub use controller::ControllerConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use startup::StartupConfig;
pub use streams::StreamsConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on `controller.api_timeout_seconds` (one day).
const MAX_API_TIMEOUT_SECONDS: f64 = 86_400.0;

/// Unified configuration for clashmon.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClashmonConfig {
    /// Controller address and credentials
    pub controller: ControllerConfig,
    /// Streaming buffer sizes and reconnect policy
    pub streams: StreamsConfig,
    /// Startup behaviour
    pub startup: StartupConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ClashmonConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("CLASHMON_CONTROLLER_URL") {
            self.controller.url = url;
        }
        if let Ok(secret) = std::env::var("CLASHMON_SECRET") {
            self.controller.secret = Some(secret).filter(|s| !s.is_empty());
        }
        if let Ok(timeout) = std::env::var("CLASHMON_API_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.controller.api_timeout_seconds = t;
            }
        }

        if let Ok(level) = std::env::var("CLASHMON_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CLASHMON_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = crate::endpoint::parse_base_url(&self.controller.url) {
            return Err(ConfigError::Validation {
                field: "controller.url".to_string(),
                message: e.to_string(),
            });
        }

        // Duration::from_secs_f64 panics on negative, NaN or overflowing values
        let api_timeout = self.controller.api_timeout_seconds;
        if !(api_timeout > 0.0 && api_timeout <= MAX_API_TIMEOUT_SECONDS) {
            return Err(ConfigError::Validation {
                field: "controller.api_timeout_seconds".to_string(),
                message: format!(
                    "must be greater than zero and at most {}",
                    MAX_API_TIMEOUT_SECONDS
                ),
            });
        }

        let positive = [
            ("streams.chart_width", self.streams.chart_width as u64),
            ("streams.log_count", self.streams.log_count as u64),
            (
                "streams.reconnect_interval_seconds",
                self.streams.reconnect_interval_seconds,
            ),
            (
                "streams.connect_timeout_seconds",
                self.streams.connect_timeout_seconds,
            ),
            ("startup.timeout_seconds", self.startup.timeout_seconds),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Validation {
                    field: field.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(())
    }
}
