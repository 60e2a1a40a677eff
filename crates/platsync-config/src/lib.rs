//! Configuration for the sync core.
//!
//! Settings persist to disk as `config.ron`, tolerate missing and unknown
//! fields, and can be overridden from the command line.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig};
pub use error::ConfigError;
pub use platsync_multiplayer::{PredictionConfig, SyncConfig};
pub use platsync_net::MonitorConfig;
