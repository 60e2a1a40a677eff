//! Command-line overrides.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Flags shared by every platsync binary. Values override `config.ron`.
#[derive(Parser, Debug, Default)]
pub struct CliArgs {
    /// Render delay for remote players, in milliseconds.
    #[arg(long)]
    pub interpolation_delay: Option<u64>,

    /// Snapshots kept per player.
    #[arg(long)]
    pub history_size: Option<usize>,

    /// Heartbeat silence (ms) treated as a disconnect.
    #[arg(long)]
    pub heartbeat_timeout: Option<u64>,

    /// Reconnect attempts before giving up.
    #[arg(long)]
    pub max_reconnect_attempts: Option<u32>,

    /// Log filter (error, warn, info, debug, trace, or full directives).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Config directory (defaults to the platform config dir).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(delay) = args.interpolation_delay {
            self.sync.interpolation_delay_ms = delay;
        }
        if let Some(size) = args.history_size {
            self.sync.max_history_size = size;
        }
        if let Some(timeout) = args.heartbeat_timeout {
            self.monitor.heartbeat_timeout_ms = timeout;
        }
        if let Some(attempts) = args.max_reconnect_attempts {
            self.monitor.max_reconnect_attempts = attempts;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs::parse_from([
            "platsync",
            "--interpolation-delay",
            "180",
            "--max-reconnect-attempts",
            "2",
            "--log-level",
            "debug",
        ]);
        config.apply_cli_overrides(&args);
        assert_eq!(config.sync.interpolation_delay_ms, 180);
        assert_eq!(config.monitor.max_reconnect_attempts, 2);
        assert_eq!(config.debug.log_level, "debug");
        // Untouched fields keep their defaults.
        assert_eq!(config.sync.max_history_size, 10);
        assert_eq!(config.monitor.heartbeat_timeout_ms, 15_000);
    }

    #[test]
    fn test_cli_no_override() {
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_dir_flag() {
        let args = CliArgs::parse_from(["platsync", "--config", "/tmp/platsync"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/platsync")));
    }
}
