//! Controller connection configuration

use serde::{Deserialize, Serialize};

/// Where the Clash controller lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Base URL of the external controller (e.g. `http://127.0.0.1:9090`)
    pub url: String,
    /// Controller secret; sent as bearer header and `token` query parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Timeout for each one-shot API request; fractions allowed (e.g. `0.5`)
    pub api_timeout_seconds: f64,
    /// Whether command layers should restrict controller commands to superusers
    pub need_superuser: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9090".to_string(),
            secret: None,
            api_timeout_seconds: 10.0,
            need_superuser: true,
        }
    }
}
