//! Controller aggregating the control API and every streaming endpoint.
//!
//! The [`Controller`] owns one [`ApiClient`] and four subscriptions:
//! traffic, connections, logs and memory. Memory only exists on Meta
//! builds, so whether it takes part in the health aggregate is decided by
//! the capability probe run in [`Controller::prepare`].
//!
//! Status queries never fail. Before the first successful `prepare()` (and
//! after `close()`) the controller reports "not connected" and "no data".

mod error;

pub use error::{ControllerError, PrepareError};

use crate::api::{
    ApiClient, ConnectionsData, LogData, LogLevel, MemoryData, TrafficData, Version,
};
use crate::config::ClashmonConfig;
use crate::endpoint;
use crate::stream::{StreamConfig, StreamState, StreamSubscription};
use futures::future::select_all;
use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

/// What the controller learned from `GET /version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityInfo {
    pub version: String,
    /// Meta builds expose the `/memory` stream
    pub has_meta_features: bool,
}

impl From<Version> for CapabilityInfo {
    fn from(version: Version) -> Self {
        Self {
            version: version.version,
            has_meta_features: version.meta,
        }
    }
}

/// Runtime settings for a [`Controller`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    pub url: String,
    pub secret: Option<String>,
    pub api_timeout: Duration,
    /// Capacity of the traffic, connections and memory series
    pub chart_width: usize,
    /// Capacity of the log series
    pub log_count: usize,
    pub log_level: LogLevel,
    pub reconnect_interval: Duration,
    pub connect_timeout: Duration,
}

impl ControllerOptions {
    /// Options for `url` with every other setting at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_config(&ClashmonConfig::default()).with_url(url)
    }

    /// Expects a config that passed [`ClashmonConfig::validate`].
    pub fn from_config(config: &ClashmonConfig) -> Self {
        Self {
            url: config.controller.url.clone(),
            secret: config.controller.secret.clone(),
            api_timeout: Duration::from_secs_f64(config.controller.api_timeout_seconds),
            chart_width: config.streams.chart_width,
            log_count: config.streams.log_count,
            log_level: config.streams.log_level,
            reconnect_interval: Duration::from_secs(config.streams.reconnect_interval_seconds),
            connect_timeout: Duration::from_secs(config.streams.connect_timeout_seconds),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    fn stream_config(&self, capacity: usize) -> StreamConfig {
        StreamConfig {
            capacity,
            reconnect_interval: self.reconnect_interval,
            connect_timeout: self.connect_timeout,
        }
    }
}

/// Client-side controller for one Clash instance.
pub struct Controller {
    base_url: Url,
    api: ApiClient,
    traffic: StreamSubscription<TrafficData>,
    connections: StreamSubscription<ConnectionsData>,
    logs: StreamSubscription<LogData>,
    memory: StreamSubscription<MemoryData>,
    capability: RwLock<Option<CapabilityInfo>>,
}

impl Controller {
    /// Build a controller. Nothing is contacted until [`prepare`](Self::prepare).
    pub fn new(options: ControllerOptions) -> Result<Self, ControllerError> {
        let base_url = endpoint::parse_base_url(&options.url)?;
        let secret = options.secret.clone().filter(|s| !s.is_empty());

        let api = ApiClient::with_client(
            base_url.clone(),
            secret.clone(),
            options.api_timeout,
            reqwest::Client::new(),
        );

        let stream_url = |path: &str, params: &[(String, String)]| {
            endpoint::ws_endpoint(&base_url, path, params, secret.as_deref())
        };
        let chart = options.stream_config(options.chart_width);
        let log_params = [("level".to_string(), options.log_level.to_string())];

        let traffic = StreamSubscription::new("traffic", stream_url("traffic", &[]), chart.clone());
        let connections =
            StreamSubscription::new("connections", stream_url("connections", &[]), chart.clone());
        let logs = StreamSubscription::new(
            "logs",
            stream_url("logs", &log_params),
            options.stream_config(options.log_count),
        );
        let memory = StreamSubscription::new("memory", stream_url("memory", &[]), chart);

        Ok(Self {
            base_url,
            api,
            traffic,
            connections,
            logs,
            memory,
            capability: RwLock::new(None),
        })
    }

    /// Probe the controller's capabilities and start the applicable streams.
    ///
    /// Returns once every stream's control task has been spawned; the
    /// sockets themselves open asynchronously. A failed probe starts
    /// nothing and is not retried. Must not run concurrently with itself.
    pub async fn prepare(&self) -> Result<CapabilityInfo, PrepareError> {
        let version = self.api.version().await.map_err(|e| {
            tracing::warn!(url = %self.base_url, error = %e, "Capability probe failed");
            PrepareError::Probe(e)
        })?;
        let capability = CapabilityInfo::from(version);

        *self
            .capability
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(capability.clone());

        self.traffic.connect();
        self.connections.connect();
        self.logs.connect();
        if capability.has_meta_features {
            self.memory.connect();
        } else {
            // a previous prepare() may have seen a Meta build
            self.memory.disconnect().await;
        }

        tracing::info!(
            url = %self.base_url,
            version = %capability.version,
            meta = capability.has_meta_features,
            "Controller prepared"
        );
        Ok(capability)
    }

    /// Stop every stream and forget the capability. Always succeeds.
    pub async fn close(&self) {
        self.capability
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        tokio::join!(
            self.traffic.disconnect(),
            self.connections.disconnect(),
            self.logs.disconnect(),
            self.memory.disconnect(),
        );
        tracing::info!(url = %self.base_url, "Controller closed");
    }

    /// Capability learned by the last successful `prepare()`, if any.
    pub fn capability(&self) -> Option<CapabilityInfo> {
        self.capability
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_prepared(&self) -> bool {
        self.capability().is_some()
    }

    /// Meta flag; false while unprepared.
    pub fn is_meta(&self) -> bool {
        self.capability().is_some_and(|c| c.has_meta_features)
    }

    /// Every required stream has an open socket.
    ///
    /// Memory is required only on Meta builds. False while unprepared.
    pub fn connected(&self) -> bool {
        let Some(capability) = self.capability() else {
            return false;
        };
        self.traffic.connected()
            && self.connections.connected()
            && self.logs.connected()
            && (!capability.has_meta_features || self.memory.connected())
    }

    /// Traffic and connections (and memory on Meta builds) have samples.
    ///
    /// Logs are not required: a quiet controller may never log. False while
    /// unprepared.
    pub fn has_data(&self) -> bool {
        let Some(capability) = self.capability() else {
            return false;
        };
        !self.traffic.series().is_empty()
            && !self.connections.series().is_empty()
            && (!capability.has_meta_features || !self.memory.series().is_empty())
    }

    /// Resolves once [`connected`](Self::connected) is true.
    ///
    /// Driven by stream state changes. Never resolves while unprepared, so
    /// callers bound it with a timeout.
    pub async fn wait_connected(&self) {
        let mut receivers: Vec<watch::Receiver<StreamState>> = vec![
            self.traffic.watch_state(),
            self.connections.watch_state(),
            self.logs.watch_state(),
            self.memory.watch_state(),
        ];

        loop {
            if self.connected() {
                return;
            }
            let changes = receivers.iter_mut().map(|rx| Box::pin(rx.changed()));
            let (result, _, _) = select_all(changes).await;
            if result.is_err() {
                // senders live as long as `self`
                return;
            }
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn traffic(&self) -> &StreamSubscription<TrafficData> {
        &self.traffic
    }

    pub fn connections(&self) -> &StreamSubscription<ConnectionsData> {
        &self.connections
    }

    pub fn logs(&self) -> &StreamSubscription<LogData> {
        &self.logs
    }

    pub fn memory(&self) -> &StreamSubscription<MemoryData> {
        &self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> Controller {
        Controller::new(ControllerOptions::new("127.0.0.1:9").with_secret("s3cret")).unwrap()
    }

    #[test]
    fn test_unprepared_status_is_not_ready() {
        let controller = controller();
        assert!(!controller.is_prepared());
        assert!(!controller.connected());
        assert!(!controller.has_data());
        assert!(!controller.is_meta());
        assert!(controller.capability().is_none());
    }

    #[test]
    fn test_has_data_false_before_prepare_even_with_samples() {
        let controller = controller();
        controller.traffic().series().push(TrafficData { up: 1, down: 1 });
        assert!(!controller.has_data());
    }

    #[test]
    fn test_stream_urls_carry_token_and_level() {
        let controller = controller();
        assert_eq!(
            controller.traffic().endpoint_url().as_str(),
            "ws://127.0.0.1:9/traffic?token=s3cret"
        );
        assert_eq!(
            controller.logs().endpoint_url().as_str(),
            "ws://127.0.0.1:9/logs?level=info&token=s3cret"
        );
    }

    #[test]
    fn test_series_capacities_follow_options() {
        let mut options = ControllerOptions::new("http://127.0.0.1:9");
        options.chart_width = 30;
        options.log_count = 7;
        let controller = Controller::new(options).unwrap();

        assert_eq!(controller.traffic().series().capacity(), 30);
        assert_eq!(controller.connections().series().capacity(), 30);
        assert_eq!(controller.memory().series().capacity(), 30);
        assert_eq!(controller.logs().series().capacity(), 7);
    }

    #[test]
    fn test_options_from_config_keep_fractional_api_timeout() {
        let mut config = ClashmonConfig::default();
        config.controller.api_timeout_seconds = 0.5;
        config.streams.reconnect_interval_seconds = 5;

        let options = ControllerOptions::from_config(&config);
        assert_eq!(options.api_timeout, Duration::from_millis(500));
        assert_eq!(options.reconnect_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = Controller::new(ControllerOptions::new("gopher://router"));
        assert!(matches!(result, Err(ControllerError::Endpoint(_))));
    }

    #[test]
    fn test_capability_from_version() {
        let capability = CapabilityInfo::from(Version {
            version: "v1.18.0".to_string(),
            meta: true,
        });
        assert_eq!(capability.version, "v1.18.0");
        assert!(capability.has_meta_features);
    }

    #[tokio::test]
    async fn test_close_without_prepare_is_safe() {
        let controller = controller();
        controller.close().await;
        assert!(!controller.connected());
        assert_eq!(controller.traffic().state(), StreamState::Idle);
    }
}
