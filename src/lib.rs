//! clashmon - client-side monitor for Clash controllers
//!
//! Keeps resilient WebSocket subscriptions to the controller's streaming
//! endpoints (`/traffic`, `/connections`, `/logs` and, on Meta builds,
//! `/memory`), buffers their recent history in bounded series and exposes
//! a consistent "connected / has data" view to callers.
//!
//! ```no_run
//! use clashmon::controller::{Controller, ControllerOptions};
//! use clashmon::lifecycle;
//! use clashmon::summary::Summary;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = Controller::new(ControllerOptions::new("http://127.0.0.1:9090"))?;
//! lifecycle::start(&controller, Duration::from_secs(10)).await?;
//!
//! let summary = Summary::collect(&controller);
//! println!("{:?}", summary.traffic);
//!
//! lifecycle::shutdown(&controller).await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod controller;
pub mod endpoint;
pub mod lifecycle;
pub mod logging;
pub mod series;
pub mod stream;
pub mod summary;
