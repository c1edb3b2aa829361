//! CLI module for clashmon
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `watch` - Stream live status until interrupted
//! - `status` - Print one status snapshot
//! - `version` - Probe the controller version
//! - `call` - Call an arbitrary control API path
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Follow a local controller
//! clashmon --url 127.0.0.1:9090 watch
//!
//! # One-shot JSON snapshot
//! clashmon status --json
//!
//! # Passthrough call with query parameters
//! clashmon call proxies/GLOBAL/delay url=http://www.gstatic.com/generate_204 timeout=5000
//! ```

pub mod call;
pub mod completions;
pub mod config;
pub mod output;
pub mod status;
pub mod watch;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::config::ClashmonConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// clashmon - Clash controller monitor
#[derive(Parser, Debug)]
#[command(
    name = "clashmon",
    version,
    about = "Monitor traffic, connections, memory and logs of a Clash controller"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "clashmon.toml")]
    pub config: PathBuf,

    /// Override controller URL (e.g., http://127.0.0.1:9090)
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// Override controller secret
    #[arg(short, long, global = true)]
    pub secret: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow the controller and print its status periodically
    Watch(WatchArgs),
    /// Print the controller status once
    Status(StatusArgs),
    /// Show the controller version
    Version,
    /// Call a control API path
    Call(CallArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds between two status prints
    #[arg(short, long, default_value = "5")]
    pub interval: u64,

    /// Output as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Seconds to wait for the first samples
    #[arg(short, long, default_value = "5")]
    pub wait: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// API path (e.g., configs, proxies/GLOBAL/delay)
    pub path: String,

    /// Query parameters as key=value
    pub params: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "clashmon.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Load configuration with CLI overrides
///
/// A missing config file falls back to defaults; a malformed one is an error.
pub fn load_config_with_overrides(
    args: &GlobalArgs,
) -> Result<ClashmonConfig, Box<dyn std::error::Error>> {
    let mut config = if args.config.exists() {
        ClashmonConfig::load(Some(&args.config))?
    } else {
        ClashmonConfig::default()
    };

    config = config.with_env_overrides();

    if let Some(ref url) = args.url {
        config.controller.url = url.clone();
    }
    if let Some(ref secret) = args.secret {
        config.controller.secret = Some(secret.clone());
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    config.validate()?;
    Ok(config)
}
