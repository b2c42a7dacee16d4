//! # Feed Hub
//!
//! The distribution point between the single inbound channel and every
//! consumer. For each inbound frame the hub:
//!
//! 1. decodes it into a [`FeedEvent`], degrading instead of failing,
//! 2. updates the latest-value cache,
//! 3. appends it to the message log,
//! 4. calls every matching subscriber in registration order.
//!
//! Frames are processed strictly one at a time. A subscriber that errors or
//! panics is recorded in the [`DeliveryReport`] and the remaining
//! subscribers still run.

use crate::cache::LatestValueCache;
use crate::decode::{decode, Decoded, RawMessage};
use crate::errors::{DeliveryFailure, DeliveryReport, HandlerError};
use crate::events::{EventKind, FeedEvent, PacketPayload};
use crate::log::{LoggedEnvelope, MessageLog, ViolationHistory};
use crate::subscriber::{
    Callback, EventStream, SubscriberRegistry, Subscription, SubscriptionId, Topic,
};
use chrono::Utc;
use netwatch_telemetry::{
    log_feed_event, FEED_DECODE_FAILURES, FEED_ENVELOPES_RECEIVED, FEED_SUBSCRIBER_FAILURES,
};
use netwatch_types::{InterfaceInfo, PacketMetrics, RuleViolation};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Anything that accepts inbound frames.
///
/// The transport only sees this trait, so tests can drive it with a
/// recording sink instead of a full hub.
pub trait EnvelopeSink: Send + Sync {
    /// Process one inbound frame to completion.
    fn on_envelope(&self, raw: RawMessage) -> DeliveryReport;

    /// Drop all state tied to the previous connection.
    fn reset(&self);
}

/// In-process event distribution hub.
pub struct FeedHub {
    registry: Arc<SubscriberRegistry>,
    cache: RwLock<LatestValueCache>,
    log: RwLock<MessageLog>,
    violations: RwLock<ViolationHistory>,
    /// Serializes dispatch passes.
    dispatch: Mutex<()>,
    next_seq: AtomicU64,
}

impl FeedHub {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::new()),
            cache: RwLock::new(LatestValueCache::new()),
            log: RwLock::new(MessageLog::new()),
            violations: RwLock::new(ViolationHistory::default()),
            dispatch: Mutex::new(()),
            next_seq: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // SUBSCRIPTION
    // =========================================================================

    /// Register `callback` for every future envelope routed under `kind`.
    ///
    /// Registering the same callback twice yields two independent
    /// registrations, each delivered to once per envelope.
    #[must_use = "dropping a Subscription unsubscribes it"]
    pub fn subscribe<F>(&self, kind: impl Into<EventKind>, callback: F) -> Subscription
    where
        F: Fn(&FeedEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register(Topic::Kind(kind.into()), Arc::new(callback))
    }

    /// Register `callback` for every future envelope, whatever its kind.
    #[must_use = "dropping a Subscription unsubscribes it"]
    pub fn subscribe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&FeedEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register(Topic::All, Arc::new(callback))
    }

    fn register(&self, topic: Topic, callback: Callback) -> Subscription {
        let id = self.registry.register(topic, callback);
        Subscription::new(id, &self.registry)
    }

    /// Remove a registration by id, e.g. one whose handle was detached.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.remove(id)
    }

    /// Async stream of future envelopes routed under `kind`.
    pub fn stream(&self, kind: impl Into<EventKind>) -> EventStream {
        EventStream::new(&self.registry, Topic::Kind(kind.into()))
    }

    /// Async stream of every future envelope.
    pub fn stream_all(&self) -> EventStream {
        EventStream::new(&self.registry, Topic::All)
    }

    /// Number of live registrations.
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Process one inbound frame: decode, cache, log, deliver.
    ///
    /// Callbacks run on the caller's thread while the dispatch lock is held,
    /// so a callback must not feed frames back into the same hub.
    pub fn on_envelope(&self, raw: RawMessage) -> DeliveryReport {
        let _pass = self.dispatch.lock();

        let Decoded { event, error } = decode(raw);
        let kind = event.kind();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let received_at = Utc::now();

        FEED_ENVELOPES_RECEIVED
            .with_label_values(&[metric_label(&kind)])
            .inc();

        if let Some(err) = &error {
            FEED_DECODE_FAILURES.inc();
            log_feed_event!(warn, kind, "Envelope degraded during decode", seq = seq, error = %err);
        }

        let now_ms = u64::try_from(received_at.timestamp_millis()).unwrap_or_default();
        let cached = self.cache.write().record(&event, now_ms);

        self.record_side_effects(&event);

        self.log.write().append(LoggedEnvelope {
            seq,
            received_at,
            event: event.clone(),
        });

        let targets = self.registry.matching(&kind);
        let mut delivered = 0;
        let mut failures = Vec::new();

        for (id, callback) in targets {
            match invoke(&callback, &event) {
                Ok(()) => delivered += 1,
                Err(reason) => {
                    FEED_SUBSCRIBER_FAILURES.inc();
                    error!(subscription = %id, kind = %kind, seq = seq, reason = %reason, "Subscriber failed");
                    failures.push(DeliveryFailure {
                        subscription: id,
                        kind: kind.clone(),
                        reason,
                    });
                }
            }
        }

        debug!(
            kind = %kind,
            seq = seq,
            cached = cached,
            delivered = delivered,
            failed = failures.len(),
            "Envelope dispatched"
        );

        DeliveryReport {
            seq,
            kind,
            cached,
            delivered,
            failures,
            decode_error: error,
        }
    }

    fn record_side_effects(&self, event: &FeedEvent) {
        match event {
            FeedEvent::Interfaces(interfaces) => {
                info!(count = interfaces.len(), "Received interface details");
            }
            FeedEvent::PacketUpdate(PacketPayload::Decoded(packet)) => {
                debug!(packet = %packet.summary(), "Packet update");
            }
            FeedEvent::RuleViolation(violation) => {
                info!(
                    rule_id = %violation.rule_id,
                    rule_name = %violation.rule_name,
                    src_ip = %violation.src_ip,
                    dst_ip = %violation.dst_ip,
                    details = %violation.details,
                    "Rule violation"
                );
                self.violations.write().push(violation.clone());
            }
            FeedEvent::PacketUpdate(PacketPayload::Raw(_)) | FeedEvent::Opaque(_) => {}
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Latest envelope of a recognized kind. Never blocks on I/O.
    pub fn latest(&self, kind: &EventKind) -> Option<FeedEvent> {
        self.cache.read().get(kind).cloned()
    }

    /// Latest interface list, if the last `interfaces` envelope decoded.
    pub fn latest_interfaces(&self) -> Option<Vec<InterfaceInfo>> {
        match self.latest(&EventKind::Interfaces)? {
            FeedEvent::Interfaces(interfaces) => Some(interfaces),
            _ => None,
        }
    }

    /// Latest packet payload, decoded or raw.
    pub fn latest_packet(&self) -> Option<PacketPayload> {
        match self.latest(&EventKind::PacketUpdate)? {
            FeedEvent::PacketUpdate(payload) => Some(payload),
            _ => None,
        }
    }

    /// Latest rule violation, if the last `rule_violation` envelope decoded.
    pub fn latest_violation(&self) -> Option<RuleViolation> {
        match self.latest(&EventKind::RuleViolation)? {
            FeedEvent::RuleViolation(violation) => Some(violation),
            _ => None,
        }
    }

    /// Metrics derived from the last decoded packet update.
    pub fn packet_metrics(&self) -> Option<PacketMetrics> {
        self.cache.read().packet_metrics()
    }

    /// Snapshot of the message log, oldest first.
    pub fn messages(&self) -> Vec<LoggedEnvelope> {
        self.log.read().snapshot()
    }

    /// Snapshot of the newest `n` logged envelopes.
    pub fn recent_messages(&self, n: usize) -> Vec<LoggedEnvelope> {
        self.log.read().tail(n)
    }

    pub fn message_count(&self) -> usize {
        self.log.read().len()
    }

    /// Empty the message log. The cache and subscribers are untouched.
    pub fn clear_messages(&self) {
        self.log.write().clear();
    }

    /// Every rule violation since the last reset.
    pub fn rule_violations(&self) -> Vec<RuleViolation> {
        self.violations.read().snapshot()
    }

    pub fn clear_rule_violations(&self) {
        self.violations.write().clear();
    }

    /// Total envelopes processed over the hub's lifetime.
    pub fn envelopes_received(&self) -> u64 {
        self.next_seq.load(Ordering::Relaxed)
    }

    /// Clear cache, log and violation history. Subscribers stay registered.
    pub fn reset(&self) {
        let _pass = self.dispatch.lock();
        self.cache.write().clear();
        self.log.write().clear();
        self.violations.write().clear();
        debug!("Feed hub state cleared");
    }
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeSink for FeedHub {
    fn on_envelope(&self, raw: RawMessage) -> DeliveryReport {
        FeedHub::on_envelope(self, raw)
    }

    fn reset(&self) {
        FeedHub::reset(self);
    }
}

/// Run one callback, turning errors and panics into a reason string.
fn invoke(callback: &Callback, event: &FeedEvent) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Metric label for a kind. Unrecognized tags share one label.
fn metric_label(kind: &EventKind) -> &str {
    match kind {
        EventKind::Other(_) => "other",
        known => known.as_str(),
    }
}
