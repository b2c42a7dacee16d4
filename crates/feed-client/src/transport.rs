//! WebSocket transport task.
//!
//! One task per connection. It performs the handshake, then forwards every
//! inbound frame to the hub in arrival order and writes queued outbound
//! frames, until the peer closes, the socket fails, or shutdown is signalled.

use crate::config::FeedConfig;
use crate::errors::ConnectionError;
use crate::status::{ConnectionStatus, StatusBoard};
use feed_bus::{EnvelopeSink, RawMessage};
use futures_util::{SinkExt, StreamExt};
use netwatch_telemetry::{FEED_DECODE_FAILURES, FEED_SENDS};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Everything the transport task needs for one connection.
pub(crate) struct Transport {
    pub endpoint: String,
    pub config: FeedConfig,
    pub generation: u64,
    pub sink: Arc<dyn EnvelopeSink>,
    pub board: Arc<StatusBoard>,
}

impl Transport {
    pub(crate) async fn run(
        self,
        mut outbound_rx: mpsc::UnboundedReceiver<Message>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let handshake = tokio::time::timeout(
            self.config.connect_timeout,
            connect_async(self.endpoint.as_str()),
        );

        let result = tokio::select! {
            _ = &mut shutdown_rx => {
                debug!(endpoint = %self.endpoint, "Shutdown before handshake completed");
                return;
            }
            result = handshake => result,
        };

        let ws_stream = match result {
            Ok(Ok((stream, _))) => stream,
            Ok(Err(e)) => {
                self.fail(ConnectionError::Handshake {
                    endpoint: self.endpoint.clone(),
                    reason: e.to_string(),
                });
                return;
            }
            Err(_) => {
                self.fail(ConnectionError::Handshake {
                    endpoint: self.endpoint.clone(),
                    reason: format!("timed out after {:?}", self.config.connect_timeout),
                });
                return;
            }
        };

        if !self.board.update(self.generation, ConnectionStatus::Connected) {
            return;
        }
        info!(endpoint = %self.endpoint, "Connected to feed");

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    let _ = write.send(Message::Close(None)).await;
                    debug!(endpoint = %self.endpoint, "Transport shut down");
                    break;
                }
                Some(msg) = outbound_rx.recv() => {
                    if let Err(e) = write.send(msg).await {
                        FEED_SENDS.with_label_values(&["failed"]).inc();
                        self.fail(ConnectionError::Dropped(format!("write failed: {e}")));
                        break;
                    }
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.deliver(text.len(), || RawMessage::Text(text.as_str().to_owned()));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        self.deliver(data.len(), || RawMessage::Binary(data.to_vec()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(endpoint = %self.endpoint, ?frame, "Feed closed by peer");
                        self.board.update(self.generation, ConnectionStatus::Disconnected);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.fail(ConnectionError::Dropped(e.to_string()));
                        break;
                    }
                    None => {
                        self.fail(ConnectionError::Dropped(
                            "stream ended without close frame".to_string(),
                        ));
                        break;
                    }
                }
            }
        }
    }

    /// Hand a frame to the sink unless it is oversized or this connection
    /// has already been superseded. The generation stays locked for the whole
    /// dispatch, so `connect` and `disconnect` wait for it.
    fn deliver(&self, size: usize, raw: impl FnOnce() -> RawMessage) {
        if size > self.config.max_message_size {
            FEED_DECODE_FAILURES.inc();
            warn!(
                size,
                max = self.config.max_message_size,
                "Dropping oversized frame"
            );
            return;
        }
        let dispatched = self
            .board
            .while_current(self.generation, || self.sink.on_envelope(raw()));
        if dispatched.is_none() {
            debug!(endpoint = %self.endpoint, "Dropping frame from superseded connection");
        }
    }

    fn fail(&self, err: ConnectionError) {
        if self
            .board
            .update(self.generation, ConnectionStatus::Error(err.clone()))
        {
            error!(endpoint = %self.endpoint, error = %err, "Feed transport error");
        }
    }
}
