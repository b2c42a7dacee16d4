//! Prometheus metrics for the NetWatch feed.
//!
//! All metrics follow the naming convention: `nw_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // DISTRIBUTION METRICS
    // =========================================================================

    /// Envelopes received on the inbound channel, by event kind
    pub static ref FEED_ENVELOPES_RECEIVED: IntCounterVec = IntCounterVec::new(
        Opts::new("nw_feed_envelopes_received_total", "Envelopes received on the feed"),
        &["kind"]
    ).expect("metric creation failed");

    /// Envelopes whose payload could not be decoded into its typed form
    pub static ref FEED_DECODE_FAILURES: IntCounter = IntCounter::new(
        "nw_feed_decode_failures_total",
        "Envelopes degraded to opaque or raw form"
    ).expect("metric creation failed");

    /// Subscriber callbacks that returned an error or panicked
    pub static ref FEED_SUBSCRIBER_FAILURES: IntCounter = IntCounter::new(
        "nw_feed_subscriber_failures_total",
        "Subscriber callbacks that failed during delivery"
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSPORT METRICS
    // =========================================================================

    /// Outbound sends, by outcome
    pub static ref FEED_SENDS: IntCounterVec = IntCounterVec::new(
        Opts::new("nw_feed_sends_total", "Outbound send attempts"),
        &["outcome"]  // outcome: sent/rejected/failed
    ).expect("metric creation failed");

    /// Connection state: 0 disconnected, 1 connecting, 2 connected, 3 error
    pub static ref FEED_CONNECTION_STATE: IntGauge = IntGauge::new(
        "nw_feed_connection_state",
        "Current feed connection state"
    ).expect("metric creation failed");
}

/// Handle proving the metrics were registered.
pub struct MetricsHandle {
    _registered: usize,
}

/// Register all metrics with the global registry.
///
/// Counters work whether or not they are registered; registration only
/// makes them visible to [`encode_metrics`].
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(FEED_ENVELOPES_RECEIVED.clone()),
        Box::new(FEED_DECODE_FAILURES.clone()),
        Box::new(FEED_SUBSCRIBER_FAILURES.clone()),
        Box::new(FEED_SENDS.clone()),
        Box::new(FEED_CONNECTION_STATE.clone()),
    ];
    let count = metrics.len();

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registered: count,
    })
}

/// Encode all registered metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
