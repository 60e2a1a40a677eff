//! Headless two-player session on a virtual clock.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p platsync-demo -- --latency 120 --reconnect-after 2`.

mod sim;

use clap::Parser;
use platsync_config::{CliArgs, Config};
use tracing::info;

use crate::sim::{Scenario, Simulation};

#[derive(Parser, Debug)]
#[command(about = "Simulated two-player sync session")]
struct DemoArgs {
    #[command(flatten)]
    cli: CliArgs,

    /// Frames to simulate before and after the outage.
    #[arg(long, default_value_t = 240)]
    frames: u32,

    /// One-way latency of the simulated link (ms).
    #[arg(long, default_value_t = 80)]
    latency: u64,

    /// Frame on which the link goes down.
    #[arg(long, default_value_t = 150)]
    outage_frame: u32,

    /// Reconnect attempt on which the link comes back (0 = never).
    #[arg(long, default_value_t = 2)]
    reconnect_after: u32,
}

fn main() {
    let args = DemoArgs::parse();

    let config_dir = match args.cli.config.clone() {
        Some(dir) => Some(dir),
        None => Config::default_dir()
            .map_err(|e| eprintln!("{e}, running without a config file"))
            .ok(),
    };

    let mut config = match config_dir.as_deref() {
        Some(dir) => Config::load_or_create(dir).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {e}, using defaults");
            Config::default()
        }),
        None => Config::default(),
    };
    config.apply_cli_overrides(&args.cli);

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    platsync_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    info!(
        interpolation_delay_ms = config.sync.interpolation_delay_ms,
        history = config.sync.max_history_size,
        heartbeat_timeout_ms = config.monitor.heartbeat_timeout_ms,
        "starting sync demo"
    );

    let scenario = Scenario {
        frames: args.frames,
        latency_ms: args.latency,
        outage_frame: args.outage_frame,
        reconnect_after: args.reconnect_after,
    };
    let mut simulation = Simulation::new(&config, scenario);
    simulation.run();
    simulation.report();
}
