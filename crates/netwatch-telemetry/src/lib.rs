//! # NetWatch Telemetry
//!
//! Logging and metrics shared by every NetWatch crate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use netwatch_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // tracing macros and feed counters are live from here on
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NW_SERVICE_NAME` | `netwatch` | Service name in logs |
//! | `NW_LOG_LEVEL` | `info` | Log filter, falls back to `RUST_LOG` |
//! | `NW_JSON_LOGS` | `false` | JSON log lines (default on in containers) |
//! | `NW_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, StructuredLogger};
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, FEED_CONNECTION_STATE,
    FEED_DECODE_FAILURES, FEED_ENVELOPES_RECEIVED, FEED_SENDS, FEED_SUBSCRIBER_FAILURES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    let logger = init_logging(&config)?;

    Ok(TelemetryGuard {
        _logger: logger,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logger: StructuredLogger,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::Config("bad".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: bad");
    }
}
