//! # Message Log
//!
//! Append-only record of every envelope, for the generic "all messages"
//! consumer, plus the running history of rule violations.

use crate::events::FeedEvent;
use chrono::{DateTime, Utc};
use netwatch_types::RuleViolation;
use serde::Serialize;

/// One logged envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedEnvelope {
    /// Arrival sequence number, starting at 1 for each hub.
    pub seq: u64,
    pub received_at: DateTime<Utc>,
    pub event: FeedEvent,
}

/// Unbounded append-only envelope log.
///
/// Clearing the log has no effect on the latest-value cache or delivery.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<LoggedEnvelope>,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LoggedEnvelope) {
        self.entries.push(entry);
    }

    /// Copy of every entry, oldest first.
    pub fn snapshot(&self) -> Vec<LoggedEnvelope> {
        self.entries.clone()
    }

    /// Copy of the newest `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> Vec<LoggedEnvelope> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Every rule violation received, in arrival order.
#[derive(Debug, Default)]
pub struct ViolationHistory {
    violations: Vec<RuleViolation>,
}

impl ViolationHistory {
    pub fn push(&mut self, violation: RuleViolation) {
        self.violations.push(violation);
    }

    pub fn snapshot(&self) -> Vec<RuleViolation> {
        self.violations.clone()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn clear(&mut self) {
        self.violations.clear();
    }
}
