//! Per-connection handle stored in the connection registry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

/// A serialized text frame queued for a connection's writer task.
///
/// Shared so that a broadcast serializes its payload once.
pub type OutboundFrame = Arc<str>;

/// State for a single WebSocket connection.
///
/// The socket itself is owned by the connection's writer task; this handle
/// only holds the sending half of the writer's queue. Once every handle for a
/// connection is dropped the writer sends a close frame and exits, so the
/// transport is closed exactly once.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique connection identifier (`client_` prefixed ULID).
    pub id: String,
    /// When the transport was accepted.
    pub connected_at: DateTime<Utc>,
    /// Company this connection registered for. Only the registry writes this.
    pub(super) company_id: Option<String>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl Connection {
    pub fn new(id: String, outbound: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self {
            id,
            connected_at: Utc::now(),
            company_id: None,
            outbound,
        }
    }

    /// Create a connection together with the receiving end of its outbound queue.
    pub fn channel(id: String) -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(id, tx), rx)
    }

    /// The company key bound via a `register` message, if any.
    pub fn company_id(&self) -> Option<&str> {
        self.company_id.as_deref()
    }

    /// Whether the writer task is still draining this connection's queue.
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Queue an already-serialized frame. Never blocks.
    ///
    /// Returns `false` if the transport has gone away.
    pub fn send_frame(&self, frame: OutboundFrame) -> bool {
        self.outbound.send(frame).is_ok()
    }

    /// Serialize and queue a message.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> bool {
        match encode(message) {
            Some(frame) => self.send_frame(frame),
            None => false,
        }
    }
}

/// Serialize a message into a shareable text frame.
pub fn encode<T: Serialize + ?Sized>(message: &T) -> Option<OutboundFrame> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize outbound message");
            None
        }
    }
}
