//! # Latest-Value Cache
//!
//! Keeps the most recent payload per recognized event kind so that
//! consumers attaching late can render immediately.
//!
//! Slots are overwritten, never merged. A recognized kind whose payload had
//! the wrong shape leaves its slot alone. Packet metrics are derived from the
//! last packet update that decoded successfully.

use crate::events::{EventKind, FeedEvent, PacketPayload};
use netwatch_types::PacketMetrics;
use std::collections::HashMap;

/// Most recent value per event kind.
#[derive(Debug, Default)]
pub struct LatestValueCache {
    slots: HashMap<EventKind, FeedEvent>,
    packet_metrics: Option<PacketMetrics>,
}

impl LatestValueCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event. Returns `true` if it took a cache slot.
    ///
    /// Only typed payloads of recognized kinds are cached. An opaque event
    /// never takes a slot, even when it carries a recognized tag. A packet
    /// whose nested string failed to decode is cached as raw text.
    pub fn record(&mut self, event: &FeedEvent, now_ms: u64) -> bool {
        let kind = event.kind();
        if !kind.is_recognized() || matches!(event, FeedEvent::Opaque(_)) {
            return false;
        }

        if let FeedEvent::PacketUpdate(PacketPayload::Decoded(packet)) = event {
            self.packet_metrics = Some(PacketMetrics::from_packet(packet, now_ms));
        }

        self.slots.insert(kind, event.clone());
        true
    }

    /// Latest event of `kind`, if any arrived.
    pub fn get(&self, kind: &EventKind) -> Option<&FeedEvent> {
        self.slots.get(kind)
    }

    /// Metrics from the last decoded packet update.
    pub fn packet_metrics(&self) -> Option<PacketMetrics> {
        self.packet_metrics
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.packet_metrics = None;
    }
}
