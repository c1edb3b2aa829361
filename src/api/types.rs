//! Payload shapes of the Clash control API and its streaming endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// `GET /version` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub version: String,
    /// Set by Clash.Meta / mihomo builds, which add the `/memory` stream.
    #[serde(default)]
    pub meta: bool,
}

/// One `/traffic` message: current throughput in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficData {
    pub up: u64,
    pub down: u64,
}

/// One `/memory` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryData {
    #[serde(rename = "inuse")]
    pub in_use: u64,
    #[serde(rename = "oslimit")]
    pub os_limit: u64,
}

/// One `/logs` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogData {
    #[serde(rename = "type")]
    pub level: String,
    pub payload: String,
}

/// One `/connections` message: a full snapshot of active connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsData {
    pub download_total: u64,
    pub upload_total: u64,
    /// The daemon sends `null` when nothing is open.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    #[serde(default)]
    pub chains: Vec<String>,
    pub download: u64,
    pub upload: u64,
    pub metadata: ConnectionMetadata,
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub rule_payload: String,
    #[serde(default)]
    pub start: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionMetadata {
    pub network: String,
    #[serde(rename = "type")]
    pub connection_type: String,
    #[serde(rename = "sourceIP")]
    pub source_ip: String,
    #[serde(rename = "destinationIP")]
    pub destination_ip: String,
    pub source_port: String,
    pub destination_port: String,
    pub host: String,
    pub dns_mode: String,
    pub process_path: String,
    pub special_proxy: String,
    #[serde(rename = "inboundIP", skip_serializing_if = "Option::is_none")]
    pub inbound_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbound_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbound_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbound_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sniff_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_rules: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Verbosity requested from the `/logs` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
    Silent,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}
