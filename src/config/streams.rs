//! Streaming endpoint configuration

use crate::api::LogLevel;
use serde::{Deserialize, Serialize};

/// Buffer sizes and reconnect policy for the streaming endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamsConfig {
    /// Samples kept for traffic, connections and memory (one chart's width)
    pub chart_width: usize,
    /// Log lines kept
    pub log_count: usize,
    /// Verbosity requested from `/logs`
    pub log_level: LogLevel,
    /// Fixed delay between reconnect attempts
    pub reconnect_interval_seconds: u64,
    /// Upper bound on one WebSocket handshake
    pub connect_timeout_seconds: u64,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            chart_width: 150,
            log_count: 50,
            log_level: LogLevel::Info,
            reconnect_interval_seconds: 3,
            connect_timeout_seconds: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streams_config_defaults() {
        let config = StreamsConfig::default();
        assert_eq!(config.chart_width, 150);
        assert_eq!(config.log_count, 50);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.reconnect_interval_seconds, 3);
    }

    #[test]
    fn test_streams_config_accepts_warn_alias() {
        let config: StreamsConfig = toml::from_str(r#"log_level = "warn""#).unwrap();
        assert_eq!(config.log_level, LogLevel::Warning);
        assert_eq!(config.chart_width, 150);
    }
}
