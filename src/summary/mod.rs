//! Point-in-time views of a [`Controller`] for command handlers and renderers.

use crate::api::{MemoryData, TrafficData};
use crate::controller::Controller;
use crate::stream::{StreamState, StreamStats, StreamSubscription};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Whether a controller is usable right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Not prepared, or a required stream is down.
    NotConnected,
    /// Connected, but a required series is still empty.
    NoData,
    Ready,
}

impl Readiness {
    pub fn of(controller: &Controller) -> Self {
        if !controller.connected() {
            Readiness::NotConnected
        } else if !controller.has_data() {
            Readiness::NoData
        } else {
            Readiness::Ready
        }
    }

    /// Message shown to users when the controller cannot answer yet.
    pub fn message(&self) -> &'static str {
        match self {
            Readiness::NotConnected => "Controller connection is not established",
            Readiness::NoData => "No data received yet, try again in a moment",
            Readiness::Ready => "Ready",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrafficPoint {
    pub timestamp: DateTime<Utc>,
    pub up: u64,
    pub down: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryPoint {
    pub timestamp: DateTime<Utc>,
    pub in_use: u64,
    pub os_limit: u64,
}

/// Totals from the latest `/connections` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionTotals {
    pub upload_total: u64,
    pub download_total: u64,
    pub active: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub payload: String,
}

/// Health of one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub name: &'static str,
    pub state: StreamState,
    pub len: usize,
    pub capacity: usize,
    pub stats: StreamStats,
}

impl StreamStatus {
    pub fn of<T>(subscription: &StreamSubscription<T>) -> Self {
        Self {
            name: subscription.name(),
            state: subscription.state(),
            len: subscription.series().len(),
            capacity: subscription.series().capacity(),
            stats: subscription.stats(),
        }
    }
}

/// Everything a renderer needs, copied out of the controller.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub readiness: Readiness,
    pub connected: bool,
    pub has_data: bool,
    pub version: Option<String>,
    pub is_meta: bool,
    pub traffic: Option<TrafficData>,
    pub traffic_points: Vec<TrafficPoint>,
    pub connections: Option<ConnectionTotals>,
    /// Empty unless the controller is a Meta build
    pub memory_points: Vec<MemoryPoint>,
    pub memory: Option<MemoryData>,
    pub logs: Vec<LogLine>,
    pub streams: Vec<StreamStatus>,
}

impl Summary {
    pub fn collect(controller: &Controller) -> Self {
        let capability = controller.capability();
        let is_meta = capability.as_ref().is_some_and(|c| c.has_meta_features);

        let traffic_points: Vec<TrafficPoint> = controller
            .traffic()
            .series()
            .snapshot()
            .iter()
            .map(|s| TrafficPoint {
                timestamp: s.observed_at,
                up: s.payload.up,
                down: s.payload.down,
            })
            .collect();

        let connections = controller.connections().series().latest().map(|s| {
            ConnectionTotals {
                upload_total: s.payload.upload_total,
                download_total: s.payload.download_total,
                active: s.payload.connections.len(),
            }
        });

        let memory_points: Vec<MemoryPoint> = if is_meta {
            controller
                .memory()
                .series()
                .snapshot()
                .iter()
                .map(|s| MemoryPoint {
                    timestamp: s.observed_at,
                    in_use: s.payload.in_use,
                    os_limit: s.payload.os_limit,
                })
                .collect()
        } else {
            Vec::new()
        };

        let logs = controller
            .logs()
            .series()
            .snapshot()
            .iter()
            .map(|s| LogLine {
                timestamp: s.observed_at,
                level: s.payload.level.clone(),
                payload: s.payload.payload.clone(),
            })
            .collect();

        let mut streams = vec![
            StreamStatus::of(controller.traffic()),
            StreamStatus::of(controller.connections()),
            StreamStatus::of(controller.logs()),
        ];
        if is_meta {
            streams.push(StreamStatus::of(controller.memory()));
        }

        Self {
            readiness: Readiness::of(controller),
            connected: controller.connected(),
            has_data: controller.has_data(),
            version: capability.map(|c| c.version),
            is_meta,
            traffic: traffic_points.last().map(|p| TrafficData {
                up: p.up,
                down: p.down,
            }),
            traffic_points,
            connections,
            memory: memory_points.last().map(|p| MemoryData {
                in_use: p.in_use,
                os_limit: p.os_limit,
            }),
            memory_points,
            logs,
            streams,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LogData;
    use crate::controller::ControllerOptions;

    fn controller() -> Controller {
        Controller::new(ControllerOptions::new("http://127.0.0.1:9")).unwrap()
    }

    #[test]
    fn test_unprepared_controller_is_not_connected() {
        let controller = controller();
        assert_eq!(Readiness::of(&controller), Readiness::NotConnected);
        assert!(!Readiness::of(&controller).is_ready());
    }

    #[test]
    fn test_summary_of_unprepared_controller() {
        let controller = controller();
        let summary = Summary::collect(&controller);

        assert_eq!(summary.readiness, Readiness::NotConnected);
        assert!(!summary.connected);
        assert!(!summary.has_data);
        assert!(summary.version.is_none());
        assert!(summary.traffic.is_none());
        assert!(summary.connections.is_none());
        assert_eq!(summary.streams.len(), 3);
        assert!(summary.streams.iter().all(|s| s.state == StreamState::Idle));
    }

    #[test]
    fn test_summary_copies_buffered_samples() {
        let controller = controller();
        controller.traffic().series().push(TrafficData { up: 1, down: 2 });
        controller.traffic().series().push(TrafficData { up: 3, down: 4 });
        controller.logs().series().push(LogData {
            level: "info".to_string(),
            payload: "hello".to_string(),
        });

        let summary = Summary::collect(&controller);

        assert_eq!(summary.traffic_points.len(), 2);
        assert_eq!(summary.traffic, Some(TrafficData { up: 3, down: 4 }));
        assert_eq!(summary.logs.len(), 1);
        assert_eq!(summary.logs[0].payload, "hello");
        // memory is only reported for Meta builds
        assert!(summary.memory_points.is_empty());
        assert!(summary.memory.is_none());
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let summary = Summary::collect(&controller());
        let value = serde_json::to_value(&summary).unwrap();

        assert_eq!(value["readiness"], "not_connected");
        assert_eq!(value["streams"][0]["name"], "traffic");
        assert_eq!(value["streams"][0]["state"], "idle");
    }

    #[test]
    fn test_readiness_messages() {
        assert!(Readiness::NoData.to_string().contains("No data"));
        assert!(Readiness::NotConnected.message().contains("not established"));
    }
}
