//! `netwatch watch`: follow the feed from the terminal.

use anyhow::{Context, Result};
use clap::Args;
use feed_bus::{EventKind, FeedEvent, FeedHub};
use feed_client::{ConnectionStatus, FeedConfig, FeedContext};
use netwatch_telemetry::encode_metrics;
use std::collections::HashSet;
use tokio_stream::StreamExt;
use tracing::info;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Feed URL, overrides NW_FEED_URL
    #[arg(long)]
    pub url: Option<String>,

    /// Event types to print (comma separated); all when omitted
    #[arg(long, value_delimiter = ',')]
    pub kinds: Vec<String>,

    /// Exit after this many printed envelopes
    #[arg(long)]
    pub limit: Option<u64>,

    /// Text to send once connected (repeatable)
    #[arg(long)]
    send: Vec<String>,

    /// Print Prometheus metrics on exit
    #[arg(long)]
    metrics: bool,
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let mut config = FeedConfig::from_env();
    if let Some(url) = args.url {
        config = config.with_endpoint(url);
    }
    config.validate()?;

    let kinds: HashSet<EventKind> = args.kinds.iter().map(|k| EventKind::from_tag(k)).collect();

    let ctx = FeedContext::new(config);
    let hub = ctx.hub();
    let mut events = hub.stream_all();
    let mut status = ctx.watch_status();

    let handle = ctx.connect_default()?;
    info!(connection = %handle, "Watching feed");

    let mut printed = 0u64;
    let mut pending_sends = Some(args.send);

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            changed = status.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = status.borrow_and_update().clone();
                match current {
                    ConnectionStatus::Connected => {
                        for text in pending_sends.take().unwrap_or_default() {
                            let outcome = ctx.send(text).context("send failed")?;
                            info!(?outcome, "Sent message");
                        }
                    }
                    ConnectionStatus::Error(err) => break Err(err).context("feed connection failed"),
                    ConnectionStatus::Disconnected => {
                        println!("feed closed");
                        break Ok(());
                    }
                    ConnectionStatus::Connecting => {}
                }
            }
            event = events.next() => {
                let Some(event) = event else { break Ok(()) };
                if !kinds.is_empty() && !kinds.contains(&event.kind()) {
                    continue;
                }
                print_event(&hub, &event);
                printed += 1;
                if args.limit.is_some_and(|limit| printed >= limit) {
                    break Ok(());
                }
            }
        }
    };

    ctx.disconnect();

    if args.metrics {
        println!("{}", encode_metrics()?);
    }
    result
}

fn print_event(hub: &FeedHub, event: &FeedEvent) {
    println!("[{}] {}", event.kind(), event.summary());

    if matches!(event, FeedEvent::PacketUpdate(_)) {
        if let Some(metrics) = hub.packet_metrics() {
            println!(
                "    rate={:.2} pkt/s avg={:.2} B total={} dropped={} ({:.2}%)",
                metrics.packet_rate,
                metrics.avg_size,
                metrics.total_packets,
                metrics.total_dropped(),
                metrics.drop_ratio() * 100.0
            );
        }
    }
}
