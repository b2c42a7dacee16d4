//! Mock server configuration.

use crate::MockError;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Mock feed server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MockServerConfig {
    /// Address to listen on; port 0 picks a free port
    pub bind: SocketAddr,
    /// Time between `packet_update` envelopes
    pub packet_interval: Duration,
    /// Time between rule violation rolls
    pub violation_interval: Duration,
    /// Chance that a roll emits a `rule_violation`
    pub violation_probability: f64,
    /// Fixed RNG seed for reproducible sample data
    pub seed: Option<u64>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            packet_interval: Duration::from_millis(1000),
            violation_interval: Duration::from_millis(8000),
            violation_probability: 0.3,
            seed: None,
        }
    }
}

impl MockServerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `NW_MOCK_BIND`: Listen address (default: 127.0.0.1:8080)
    /// - `NW_MOCK_PACKET_INTERVAL_MS`: Packet interval (default: 1000)
    /// - `NW_MOCK_VIOLATION_INTERVAL_MS`: Violation interval (default: 8000)
    /// - `NW_MOCK_VIOLATION_PROBABILITY`: Violation chance (default: 0.3)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind: env::var("NW_MOCK_BIND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bind),

            packet_interval: env_millis("NW_MOCK_PACKET_INTERVAL_MS")
                .unwrap_or(defaults.packet_interval),

            violation_interval: env_millis("NW_MOCK_VIOLATION_INTERVAL_MS")
                .unwrap_or(defaults.violation_interval),

            violation_probability: env::var("NW_MOCK_VIOLATION_PROBABILITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.violation_probability),

            seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), MockError> {
        if self.packet_interval.is_zero() || self.violation_interval.is_zero() {
            return Err(MockError::Config("intervals must be non-zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.violation_probability) {
            return Err(MockError::Config(format!(
                "violation probability {} is outside 0..=1",
                self.violation_probability
            )));
        }
        Ok(())
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}
