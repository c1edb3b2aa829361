//! Startup orchestration configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// How long startup waits for every required stream to connect
    pub timeout_seconds: u64,
    /// Block startup until connected; when false startup runs in the background
    pub wait_for_connection: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            wait_for_connection: true,
        }
    }
}
