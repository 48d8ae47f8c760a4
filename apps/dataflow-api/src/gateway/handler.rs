//! Inbound frame dispatch: register, data, ping, and unknown messages.

use std::sync::Arc;

use chrono::Utc;

use super::audit::AuditSink;
use super::events::{ClientMessage, Envelope, MessageKind, ServerMessage};
use super::forwarder::EventForwarder;
use super::registry::ConnectionRegistry;

/// Parses inbound frames and produces the reply, if any, for the sender.
///
/// Every frame yields exactly one audit record. A `data` frame yields at most
/// one forward attempt, made after the registry lookup has released its lock.
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    forwarder: Arc<dyn EventForwarder>,
    audit: Arc<dyn AuditSink>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        forwarder: Arc<dyn EventForwarder>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            registry,
            forwarder,
            audit,
        }
    }

    /// Handle one text frame from `connection_id`.
    pub async fn handle_text(&self, connection_id: &str, text: &str) -> Option<ServerMessage> {
        let received_at = Utc::now();
        let company_id = self
            .registry
            .lookup_by_id(connection_id)
            .and_then(|c| c.company_id().map(str::to_owned));

        let mut envelope = Envelope {
            kind: MessageKind::Unknown,
            raw: text.to_string(),
            payload: None,
            sender_id: connection_id.to_string(),
            company_id,
            received_at,
        };

        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "unparseable frame");
                self.audit.record(&envelope).await;
                return Some(ServerMessage::error("Invalid message format"));
            }
        };

        envelope.kind = message.kind();
        tracing::debug!(%connection_id, kind = envelope.kind.as_str(), "frame received");

        let reply = match message {
            ClientMessage::Register { company_id } => self.handle_register(connection_id, company_id),
            ClientMessage::Ping => Some(ServerMessage::Pong),
            ClientMessage::Data { payload: Some(payload) } => {
                envelope.payload = Some(payload);
                Some(self.handle_data(&envelope).await)
            }
            ClientMessage::Data { payload: None } => {
                tracing::warn!(%connection_id, "data message without payload; dropped");
                None
            }
            ClientMessage::Unknown { type_name } => {
                tracing::warn!(%connection_id, type_name = ?type_name, "unknown message type");
                None
            }
        };

        self.audit.record(&envelope).await;
        reply
    }

    fn handle_register(&self, connection_id: &str, company_id: Option<String>) -> Option<ServerMessage> {
        let Some(company_id) = company_id else {
            return Some(ServerMessage::error("Company ID is required"));
        };

        match self.registry.bind_group(connection_id, &company_id) {
            Ok(displaced) => {
                if let Some(displaced) = displaced {
                    tracing::info!(
                        %company_id,
                        %connection_id,
                        %displaced,
                        "company key rebound; previous connection is no longer addressable"
                    );
                }
                tracing::info!(%connection_id, %company_id, "client registered");
                Some(ServerMessage::registered(&company_id))
            }
            Err(e) => {
                tracing::error!(error = %e, %company_id, "register from a connection missing in the registry");
                None
            }
        }
    }

    async fn handle_data(&self, envelope: &Envelope) -> ServerMessage {
        match self.forwarder.forward(envelope).await {
            Ok(body) => {
                tracing::info!(connection_id = %envelope.sender_id, "data forwarded");
                ServerMessage::data_processed(body)
            }
            Err(e) => {
                tracing::warn!(connection_id = %envelope.sender_id, error = %e, "data forward failed");
                ServerMessage::data_error(e.to_string())
            }
        }
    }
}
