//! # Error Types
//!
//! Errors raised while decoding envelopes and delivering them. None of these
//! abort a dispatch pass; they are collected into a [`DeliveryReport`].

use crate::events::EventKind;
use crate::subscriber::SubscriptionId;
use thiserror::Error;

/// Error type subscriber callbacks return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An envelope that could not be decoded into its typed form.
///
/// The envelope is still logged and delivered in a degraded form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame was not JSON.
    #[error("Message is not valid JSON: {0}")]
    InvalidJson(String),

    /// A binary frame was not UTF-8.
    #[error("Binary message is not valid UTF-8")]
    InvalidUtf8,

    /// A recognized type carried a payload of the wrong shape.
    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: EventKind, reason: String },

    /// `packet_info` was a string that did not decode as a packet.
    #[error("Nested packet_info did not decode: {0}")]
    NestedPacket(String),
}

/// A subscriber callback failed while handling an envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Subscriber {subscription} failed on {kind} envelope: {reason}")]
pub struct DeliveryFailure {
    pub subscription: SubscriptionId,
    pub kind: EventKind,
    pub reason: String,
}

/// Outcome of one distribution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Arrival sequence number of the envelope.
    pub seq: u64,
    /// Routing key the envelope was dispatched under.
    pub kind: EventKind,
    /// Whether the latest-value cache was updated.
    pub cached: bool,
    /// Subscribers that handled the envelope without error.
    pub delivered: usize,
    /// Subscribers that returned an error or panicked.
    pub failures: Vec<DeliveryFailure>,
    /// Set when the envelope was degraded during decoding.
    pub decode_error: Option<DecodeError>,
}

impl DeliveryReport {
    /// Total subscribers the envelope was offered to.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }

    /// True when decoding succeeded and every subscriber succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.decode_error.is_none()
    }
}
