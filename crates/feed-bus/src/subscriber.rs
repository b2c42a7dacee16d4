//! # Subscribers
//!
//! Registration side of the distribution layer.
//!
//! Registrations are kept in a map ordered by a monotonically increasing id,
//! so iterating the map yields registration order.

use crate::errors::HandlerError;
use crate::events::{EventKind, FeedEvent};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::debug;

/// Callback invoked for each matching envelope.
pub type Callback = Arc<dyn Fn(&FeedEvent) -> Result<(), HandlerError> + Send + Sync>;

/// Identifier of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// What a registration listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// Envelopes routed under one kind.
    Kind(EventKind),
    /// Every envelope.
    All,
}

impl Topic {
    fn matches(&self, kind: &EventKind) -> bool {
        match self {
            Self::Kind(k) => k == kind,
            Self::All => true,
        }
    }
}

struct Registration {
    topic: Topic,
    callback: Callback,
}

/// Ordered set of subscriber registrations.
#[derive(Default)]
pub struct SubscriberRegistry {
    registrations: RwLock<BTreeMap<SubscriptionId, Registration>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration and return its id.
    pub fn register(&self, topic: Topic, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        debug!(subscription = %id, topic = ?topic, "Subscriber registered");
        self.registrations
            .write()
            .insert(id, Registration { topic, callback });
        id
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.registrations.write().remove(&id).is_some();
        if removed {
            debug!(subscription = %id, "Subscriber removed");
        }
        removed
    }

    /// Callbacks interested in `kind`, in registration order.
    ///
    /// Returns a snapshot so delivery runs without holding the lock.
    pub fn matching(&self, kind: &EventKind) -> Vec<(SubscriptionId, Callback)> {
        self.registrations
            .read()
            .iter()
            .filter(|(_, reg)| reg.topic.matches(kind))
            .map(|(id, reg)| (*id, Arc::clone(&reg.callback)))
            .collect()
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live registrations for one topic.
    pub fn count_for(&self, topic: &Topic) -> usize {
        self.registrations
            .read()
            .values()
            .filter(|reg| &reg.topic == topic)
            .count()
    }
}

/// Capability returned by `subscribe`.
///
/// Calling [`Subscription::unsubscribe`] removes exactly this registration.
/// Dropping the handle also unsubscribes, unless it was detached.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<SubscriberRegistry>,
    detached: bool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, registry: &Arc<SubscriberRegistry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
            detached: false,
        }
    }

    /// Identifier of the registration.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop delivery to this registration. Safe to call repeatedly.
    ///
    /// Returns `true` only on the call that actually removed it.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }

    /// Keep the registration alive after this handle is dropped.
    ///
    /// The returned id can still be passed to the hub's `unsubscribe`.
    pub fn detach(mut self) -> SubscriptionId {
        self.detached = true;
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("detached", &self.detached)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.unsubscribe();
        }
    }
}

/// Async stream of events for one topic.
///
/// Backed by an unbounded channel fed from a regular subscription, so
/// delivery from the dispatch pass never blocks.
pub struct EventStream {
    inner: UnboundedReceiverStream<FeedEvent>,
    subscription: Subscription,
}

impl EventStream {
    pub(crate) fn new(registry: &Arc<SubscriberRegistry>, topic: Topic) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: Callback = Arc::new(move |event: &FeedEvent| {
            tx.send(event.clone())
                .map_err(|_| HandlerError::from("event stream receiver dropped"))
        });
        let id = registry.register(topic, callback);

        Self {
            inner: UnboundedReceiverStream::new(rx),
            subscription: Subscription::new(id, registry),
        }
    }

    /// Identifier of the underlying registration.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.subscription.id()
    }
}

impl Stream for EventStream {
    type Item = FeedEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
