//! # Feed Context
//!
//! Owns the single inbound connection and the hub it feeds. Consumers hold
//! the context (or just its `Arc<FeedHub>`) and never touch the socket.

use crate::config::{validate_endpoint, FeedConfig};
use crate::errors::{ConnectionError, FeedError, SendOutcome, SendRejected};
use crate::status::{ConnectionStatus, StatusBoard};
use crate::transport::Transport;
use feed_bus::{EnvelopeSink, FeedHub};
use netwatch_telemetry::FEED_SENDS;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Sent as-is.
    Text(String),
    /// Serialized to JSON text.
    Json(Value),
}

impl Outbound {
    fn into_text(self) -> Result<String, FeedError> {
        match self {
            Outbound::Text(text) => Ok(text),
            Outbound::Json(value) => Ok(serde_json::to_string(&value)?),
        }
    }
}

impl From<&str> for Outbound {
    fn from(text: &str) -> Self {
        Outbound::Text(text.to_string())
    }
}

impl From<String> for Outbound {
    fn from(text: String) -> Self {
        Outbound::Text(text)
    }
}

impl From<Value> for Outbound {
    fn from(value: Value) -> Self {
        Outbound::Json(value)
    }
}

/// Identifies one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub id: Uuid,
    pub endpoint: String,
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.endpoint, self.id)
    }
}

struct ActiveConnection {
    handle: ConnectionHandle,
    outbound: mpsc::UnboundedSender<Message>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ActiveConnection {
    fn shut_down(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Connection lifecycle plus the hub it distributes to.
pub struct FeedContext {
    hub: Arc<FeedHub>,
    config: FeedConfig,
    board: Arc<StatusBoard>,
    /// Serializes connect and disconnect.
    lifecycle: Mutex<()>,
    active: Mutex<Option<ActiveConnection>>,
    last_warning: Mutex<Option<SendRejected>>,
}

impl FeedContext {
    /// Create a disconnected context with a fresh hub.
    pub fn new(config: FeedConfig) -> Self {
        Self::with_hub(Arc::new(FeedHub::new()), config)
    }

    /// Create a disconnected context around an existing hub.
    pub fn with_hub(hub: Arc<FeedHub>, config: FeedConfig) -> Self {
        Self {
            hub,
            config,
            board: Arc::new(StatusBoard::new()),
            lifecycle: Mutex::new(()),
            active: Mutex::new(None),
            last_warning: Mutex::new(None),
        }
    }

    /// The hub consumers subscribe to.
    pub fn hub(&self) -> Arc<FeedHub> {
        Arc::clone(&self.hub)
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Open the inbound channel to `endpoint`.
    ///
    /// Returns as soon as the transport task is spawned; watch
    /// [`Self::watch_status`] for `Connected` or `Error`. An existing
    /// connection is torn down first and hub state is cleared.
    ///
    /// Must be called from within a Tokio runtime, and never from inside a
    /// subscriber callback: an in-flight dispatch holds the connection
    /// generation, and `connect` waits for it.
    pub fn connect(&self, endpoint: &str) -> Result<ConnectionHandle, FeedError> {
        validate_endpoint(endpoint)?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ConnectionError::NoRuntime)?;

        let _lifecycle = self.lifecycle.lock();
        if let Some(mut previous) = self.active.lock().take() {
            info!(connection = %previous.handle, "Replacing existing feed connection");
            previous.shut_down();
        }

        let generation = self.board.begin();
        self.hub.reset();

        let handle = ConnectionHandle {
            id: Uuid::new_v4(),
            endpoint: endpoint.to_string(),
        };
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let sink: Arc<dyn EnvelopeSink> = self.hub.clone();
        let transport = Transport {
            endpoint: endpoint.to_string(),
            config: self.config.clone(),
            generation,
            sink,
            board: Arc::clone(&self.board),
        };
        runtime.spawn(transport.run(outbound_rx, shutdown_rx));

        info!(connection = %handle, "Connecting to feed");
        *self.active.lock() = Some(ActiveConnection {
            handle: handle.clone(),
            outbound: outbound_tx,
            shutdown: Some(shutdown_tx),
        });
        Ok(handle)
    }

    /// Connect to the configured endpoint.
    pub fn connect_default(&self) -> Result<ConnectionHandle, FeedError> {
        let endpoint = self.config.endpoint.clone();
        self.connect(&endpoint)
    }

    /// Transmit a payload if connected.
    ///
    /// While not connected this is a no-op returning
    /// [`SendOutcome::Rejected`]; nothing is queued for later.
    pub fn send(&self, payload: impl Into<Outbound>) -> Result<SendOutcome, FeedError> {
        let text = payload.into().into_text()?;

        let active = self.active.lock();
        let status = self.board.current();
        let connection = match active.as_ref() {
            Some(connection) if status.is_connected() => connection,
            _ => return Ok(self.reject(status)),
        };

        // The task may have exited before its status update was observed.
        if connection.outbound.send(Message::Text(text.into())).is_err() {
            return Ok(self.reject(self.board.current()));
        }

        FEED_SENDS.with_label_values(&["sent"]).inc();
        debug!(connection = %connection.handle, "Outbound message queued for write");
        Ok(SendOutcome::Sent)
    }

    /// Serialize any value to JSON and send it.
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<SendOutcome, FeedError> {
        self.send(Outbound::Json(serde_json::to_value(value)?))
    }

    /// Release the transport. Safe to call repeatedly.
    ///
    /// Waits for an in-flight dispatch to finish, so no frame reaches the hub
    /// once this returns. Like `connect`, not callable from a subscriber.
    pub fn disconnect(&self) {
        let _lifecycle = self.lifecycle.lock();
        let previous = self.active.lock().take();
        match previous {
            Some(mut connection) => {
                connection.shut_down();
                self.board.end();
                info!(connection = %connection.handle, "Disconnected from feed");
            }
            None => {
                if self.board.current() != ConnectionStatus::Disconnected {
                    self.board.end();
                }
            }
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.board.current()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Receiver that observes every status transition.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.board.subscribe()
    }

    /// Most recent transport failure, if any.
    pub fn last_error(&self) -> Option<ConnectionError> {
        self.board.last_error()
    }

    /// Most recent rejected send, if any.
    pub fn last_warning(&self) -> Option<SendRejected> {
        self.last_warning.lock().clone()
    }

    /// The live connection, if one was opened and not yet released.
    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.active.lock().as_ref().map(|c| c.handle.clone())
    }

    fn reject(&self, status: ConnectionStatus) -> SendOutcome {
        let rejected = SendRejected { status };
        FEED_SENDS.with_label_values(&["rejected"]).inc();
        warn!(reason = %rejected, "Send dropped, feed not connected");
        *self.last_warning.lock() = Some(rejected.clone());
        SendOutcome::Rejected(rejected)
    }
}

impl Drop for FeedContext {
    fn drop(&mut self) {
        if let Some(mut connection) = self.active.get_mut().take() {
            connection.shut_down();
        }
    }
}
