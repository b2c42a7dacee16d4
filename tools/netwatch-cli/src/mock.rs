//! `netwatch mock-server`: serve random sample data.

use anyhow::{Context, Result};
use clap::Args;
use feed_mock::{MockFeedServer, MockServerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub struct MockArgs {
    /// Listen address, overrides NW_MOCK_BIND
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Milliseconds between packet updates
    #[arg(long)]
    packet_interval_ms: Option<u64>,

    /// Milliseconds between rule violation rolls
    #[arg(long)]
    violation_interval_ms: Option<u64>,

    /// Chance (0..=1) that a roll emits a rule violation
    #[arg(long)]
    violation_probability: Option<f64>,

    /// Seed for reproducible sample data
    #[arg(long)]
    seed: Option<u64>,
}

impl MockArgs {
    pub fn into_config(self) -> MockServerConfig {
        let mut config = MockServerConfig::from_env();
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(ms) = self.packet_interval_ms {
            config.packet_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.violation_interval_ms {
            config.violation_interval = Duration::from_millis(ms);
        }
        if let Some(p) = self.violation_probability {
            config.violation_probability = p;
        }
        config.seed = self.seed.or(config.seed);
        config
    }
}

pub async fn run(args: MockArgs) -> Result<()> {
    let config = args.into_config();
    let server = MockFeedServer::bind(config)
        .await
        .context("failed to start mock server")?
        .spawn()?;

    println!("mock feed listening on {}", server.url());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!(clients = server.active_clients(), "Stopping mock server");
    server.shutdown().await;
    Ok(())
}
