//! Error types for the feed client.

use crate::status::ConnectionStatus;
use thiserror::Error;

/// Why the inbound channel could not be established or was lost.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Handshake with {endpoint} failed: {reason}")]
    Handshake { endpoint: String, reason: String },

    #[error("Connection dropped: {0}")]
    Dropped(String),

    #[error("No async runtime available to drive the connection")]
    NoRuntime,
}

/// Errors surfaced by [`crate::FeedContext`] operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Send failed: {0}")]
    Send(String),
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Send(format!("serialization failed: {err}"))
    }
}

/// A send attempted while the feed was not connected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot send while feed is {status}")]
pub struct SendRejected {
    pub status: ConnectionStatus,
}

/// Result of a send that did not hit a hard failure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum SendOutcome {
    /// Handed to the transport for transmission.
    Sent,
    /// Dropped without transmitting. Sends are never queued.
    Rejected(SendRejected),
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent)
    }
}
