//! # Mock Feed Server
//!
//! Stands in for the capture backend during development and tests. Every
//! client gets its own stream:
//!
//! 1. an `interfaces` envelope immediately after the handshake,
//! 2. a `packet_update` every `packet_interval`, with `packet_info`
//!    JSON-encoded as a string on roughly half of them,
//! 3. a `rule_violation` with `violation_probability` every
//!    `violation_interval`.
//!
//! Text sent by clients is logged and kept for inspection.

use crate::config::MockServerConfig;
use crate::generators::{
    generate_violation, interfaces_envelope, packet_envelope, sample_interfaces,
    violation_envelope, CaptureSimulator,
};
use crate::MockError;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

/// State shared by the accept loop and client sessions.
#[derive(Debug, Default)]
struct ServerState {
    received: Mutex<Vec<String>>,
    active_clients: AtomicUsize,
    next_client: AtomicU64,
}

/// A bound mock server, not yet accepting.
pub struct MockFeedServer {
    listener: TcpListener,
    config: MockServerConfig,
    state: Arc<ServerState>,
}

impl MockFeedServer {
    /// Bind the listener. Use port 0 to let the OS pick one.
    pub async fn bind(config: MockServerConfig) -> Result<Self, MockError> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|source| MockError::Bind {
                addr: config.bind,
                source,
            })?;

        Ok(Self {
            listener,
            config,
            state: Arc::new(ServerState::default()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, MockError> {
        Ok(self.listener.local_addr()?)
    }

    /// Start accepting clients in a background task.
    pub fn spawn(self) -> Result<MockServerHandle, MockError> {
        let addr = self.local_addr()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::clone(&self.state);
        let task = tokio::spawn(self.accept_loop(shutdown_rx));

        info!(%addr, "Mock feed server listening");
        Ok(MockServerHandle {
            addr,
            state,
            shutdown_tx,
            task,
        })
    }

    async fn accept_loop(self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let session = ClientSession {
                            id: self.state.next_client.fetch_add(1, Ordering::Relaxed) + 1,
                            peer,
                            config: self.config.clone(),
                            state: Arc::clone(&self.state),
                        };
                        tokio::spawn(session.run(stream, shutdown_rx.clone()));
                    }
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                }
            }
        }
        debug!("Mock feed server accept loop stopped");
    }
}

/// Handle to a running mock server.
///
/// Dropping the handle without calling [`MockServerHandle::shutdown`] also
/// stops the server, since every task watches the shutdown channel.
pub struct MockServerHandle {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MockServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `ws://` URL clients should connect to.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Text messages received from clients, oldest first.
    pub fn received_messages(&self) -> Vec<String> {
        self.state.received.lock().clone()
    }

    pub fn active_clients(&self) -> usize {
        self.state.active_clients.load(Ordering::Relaxed)
    }

    /// Stop accepting, close every client, and wait for the accept loop.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
        info!(addr = %self.addr, "Mock feed server stopped");
    }
}

struct ClientSession {
    id: u64,
    peer: SocketAddr,
    config: MockServerConfig,
    state: Arc<ServerState>,
}

impl ClientSession {
    async fn run(self, stream: TcpStream, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ws = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "WebSocket handshake failed");
                return;
            }
        };

        self.state.active_clients.fetch_add(1, Ordering::Relaxed);
        info!(client = self.id, peer = %self.peer, "Client connected");

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.id)),
            None => StdRng::from_entropy(),
        };
        let mut capture = CaptureSimulator::new();

        let mut packet_tick = tokio::time::interval(self.config.packet_interval);
        let mut violation_tick = tokio::time::interval(self.config.violation_interval);
        // Both intervals fire immediately; skip that so the cadence starts after the greeting.
        packet_tick.tick().await;
        violation_tick.tick().await;

        if send_json(&mut ws, interfaces_envelope(&sample_interfaces()))
            .await
            .is_ok()
        {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        let _ = ws.send(Message::Close(None)).await;
                        break;
                    }
                    _ = packet_tick.tick() => {
                        let packet = capture.next_packet(&mut rng);
                        let nested = rng.gen_bool(0.5);
                        if send_json(&mut ws, packet_envelope(&packet, nested)).await.is_err() {
                            break;
                        }
                    }
                    _ = violation_tick.tick() => {
                        if rng.gen_bool(self.config.violation_probability) {
                            let violation = generate_violation(&mut rng);
                            debug!(client = self.id, rule = %violation.rule_id, "Emitting rule violation");
                            if send_json(&mut ws, violation_envelope(&violation)).await.is_err() {
                                break;
                            }
                        }
                    }
                    inbound = ws.next() => match inbound {
                        Some(Ok(Message::Text(text))) => {
                            info!(client = self.id, message = %text.as_str(), "Received from client");
                            self.state.received.lock().push(text.as_str().to_owned());
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            debug!(client = self.id, error = %e, "Client stream error");
                            break;
                        }
                    }
                }
            }
        }

        self.state.active_clients.fetch_sub(1, Ordering::Relaxed);
        info!(client = self.id, peer = %self.peer, "Client disconnected");
    }
}

async fn send_json(
    ws: &mut WebSocketStream<TcpStream>,
    value: Value,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    ws.send(Message::Text(value.to_string().into())).await
}
