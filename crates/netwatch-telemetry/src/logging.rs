//! Structured logging setup.
//!
//! Logs carry consistent fields so they can be shipped and queried:
//! - `level`, `target`, `timestamp` from the fmt layer
//! - `service`: the configured service name, logged once at startup
//! - feed-specific fields such as `kind`, `seq` and `endpoint`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{TelemetryConfig, TelemetryError};

/// Handle returned by [`init_logging`].
pub struct StructuredLogger {
    _initialized: bool,
}

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber is already installed or the log level does
/// not parse as an `EnvFilter` directive.
pub fn init_logging(config: &TelemetryConfig) -> Result<StructuredLogger, TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("invalid log level: {e}")))?;

    let fmt_layer = if !config.console_output {
        None
    } else if config.json_logs {
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        )
    } else {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(true)
                .boxed(),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        log_level = %config.log_level,
        "Structured logging initialized"
    );

    Ok(StructuredLogger { _initialized: true })
}

/// Log a feed event with the standard `kind` field.
#[macro_export]
macro_rules! log_feed_event {
    ($level:ident, $kind:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            kind = %$kind,
            $($($field)*,)?
            $msg
        )
    };
}
