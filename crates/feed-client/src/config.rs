//! Feed client configuration.

use crate::errors::ConnectionError;
use std::env;
use std::time::Duration;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

/// Default feed endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080";

/// Default maximum inbound frame size (1 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Default time allowed for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Feed client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// WebSocket URL of the feed (`ws://` or `wss://`)
    pub endpoint: String,
    /// Inbound frames larger than this are dropped
    pub max_message_size: usize,
    /// Handshake timeout
    pub connect_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `NW_FEED_URL`: Feed endpoint (default: ws://localhost:8080)
    /// - `NW_MAX_MESSAGE_SIZE`: Inbound frame limit in bytes (default: 1 MiB)
    /// - `NW_CONNECT_TIMEOUT_MS`: Handshake timeout (default: 10000)
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("NW_FEED_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),

            max_message_size: env::var("NW_MAX_MESSAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_MESSAGE_SIZE),

            connect_timeout: env::var("NW_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Use a different endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Check that the endpoint is a usable WebSocket URL.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        validate_endpoint(&self.endpoint)
    }
}

/// Reject anything that is not a well-formed `ws://` or `wss://` URL.
pub fn validate_endpoint(endpoint: &str) -> Result<(), ConnectionError> {
    let invalid = |reason: String| ConnectionError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
        return Err(invalid("scheme must be ws:// or wss://".to_string()));
    }

    endpoint
        .into_client_request()
        .map(|_| ())
        .map_err(|e| invalid(e.to_string()))
}
