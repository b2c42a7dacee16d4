//! Connection status tracking.

use crate::errors::ConnectionError;
use netwatch_telemetry::FEED_CONNECTION_STATE;
use parking_lot::Mutex;
use std::fmt;
use tokio::sync::watch;
use tracing::info;

/// Lifecycle state of the feed connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error(ConnectionError),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Value exported on the connection state gauge.
    pub fn gauge_value(&self) -> i64 {
        match self {
            ConnectionStatus::Disconnected => 0,
            ConnectionStatus::Connecting => 1,
            ConnectionStatus::Connected => 2,
            ConnectionStatus::Error(_) => 3,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Error(e) => write!(f, "in error ({e})"),
        }
    }
}

/// Shared status cell written by the context and the transport task.
///
/// Every connection attempt gets a generation number. Updates from a task
/// whose generation is no longer current are ignored, so a connection torn
/// down by `disconnect` or a newer `connect` cannot overwrite the status.
#[derive(Debug)]
pub(crate) struct StatusBoard {
    tx: watch::Sender<ConnectionStatus>,
    generation: Mutex<u64>,
    last_error: Mutex<Option<ConnectionError>>,
}

impl StatusBoard {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionStatus::Disconnected);
        FEED_CONNECTION_STATE.set(0);
        Self {
            tx,
            generation: Mutex::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub(crate) fn current(&self) -> ConnectionStatus {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.tx.subscribe()
    }

    pub(crate) fn last_error(&self) -> Option<ConnectionError> {
        self.last_error.lock().clone()
    }

    /// Run `f` only while `generation` is current.
    ///
    /// The generation lock is held until `f` returns, so `begin` and `end`
    /// wait for an in-flight delivery and nothing from a superseded
    /// connection runs after they return.
    pub(crate) fn while_current<R>(&self, generation: u64, f: impl FnOnce() -> R) -> Option<R> {
        let current = self.generation.lock();
        (*current == generation).then(f)
    }

    /// Start a new generation in `Connecting`.
    pub(crate) fn begin(&self) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.publish(ConnectionStatus::Connecting);
        *generation
    }

    /// Invalidate the current generation and go `Disconnected`.
    pub(crate) fn end(&self) {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.publish(ConnectionStatus::Disconnected);
    }

    /// Apply `status` if `generation` is still current.
    pub(crate) fn update(&self, generation: u64, status: ConnectionStatus) -> bool {
        let current = self.generation.lock();
        if *current != generation {
            return false;
        }
        if let ConnectionStatus::Error(err) = &status {
            *self.last_error.lock() = Some(err.clone());
        }
        self.publish(status);
        true
    }

    fn publish(&self, status: ConnectionStatus) {
        FEED_CONNECTION_STATE.set(status.gauge_value());
        info!(status = %status, "Feed connection status changed");
        self.tx.send_replace(status);
    }
}
