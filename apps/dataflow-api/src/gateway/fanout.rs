//! Server-initiated delivery: unicast by id and broadcast to all or to one company.
//!
//! Every call is best effort. Frames are queued on each target's outbound
//! channel without blocking, so a slow or dead connection never holds up the
//! others, and nothing about individual failures is reported to the caller.

use std::sync::Arc;

use serde::Serialize;

use super::registry::ConnectionRegistry;
use super::session::{encode, Connection};

/// Routes administrative messages to connected clients. Cheap to clone.
#[derive(Clone)]
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Send to one connection. Silently does nothing if it is gone or closed.
    pub fn send_to<T: Serialize + ?Sized>(&self, connection_id: &str, message: &T) {
        let Some(connection) = self.registry.lookup_by_id(connection_id) else {
            tracing::debug!(%connection_id, "send_to: no such connection");
            return;
        };
        if !connection.is_open() {
            tracing::debug!(%connection_id, "send_to: connection closed");
            return;
        }
        connection.send(message);
    }

    /// Send to every open connection.
    pub fn broadcast_all<T: Serialize + ?Sized>(&self, message: &T) {
        self.deliver(message, "all", |_| true);
    }

    /// Send to every open connection bound to `company_id`, including ones
    /// that lost addressability to a later registrant of the same company.
    pub fn broadcast_to_group<T: Serialize + ?Sized>(&self, company_id: &str, message: &T) {
        self.deliver(message, company_id, |c| c.company_id() == Some(company_id));
    }

    fn deliver<T, F>(&self, message: &T, label: &str, filter: F)
    where
        T: Serialize + ?Sized,
        F: Fn(&Connection) -> bool,
    {
        let Some(frame) = encode(message) else {
            return;
        };

        let targets = self.registry.snapshot(|c| c.is_open() && filter(c));
        let mut delivered = 0usize;
        for connection in &targets {
            if connection.send_frame(frame.clone()) {
                delivered += 1;
            } else {
                tracing::debug!(
                    connection_id = %connection.id,
                    label,
                    "connection closed mid-broadcast"
                );
            }
        }

        tracing::debug!(label, recipients = targets.len(), delivered, "broadcast");
    }
}
