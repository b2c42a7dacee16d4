//! netwatch: command-line client for the NetWatch feed.
//!
//! ## Usage
//!
//! ```bash
//! # Serve sample data on localhost:8080
//! netwatch mock-server
//!
//! # Follow the feed, printing every envelope
//! netwatch watch --url ws://localhost:8080
//!
//! # Only packets and violations, stop after 20 envelopes
//! netwatch watch --kinds packet_update,rule_violation --limit 20
//! ```

mod mock;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use netwatch_telemetry::{init_telemetry, TelemetryConfig};

/// NetWatch feed client
#[derive(Parser, Debug)]
#[command(name = "netwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log filter, overrides NW_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to a feed and print envelopes as they arrive
    Watch(watch::WatchArgs),
    /// Run a mock feed server with random sample data
    MockServer(mock::MockArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if let Some(level) = cli.log_level {
        telemetry = telemetry.with_log_level(level);
    }
    let _telemetry = init_telemetry(telemetry)?;

    match cli.command {
        Command::Watch(args) => watch::run(args).await,
        Command::MockServer(args) => mock::run(args).await,
    }
}
