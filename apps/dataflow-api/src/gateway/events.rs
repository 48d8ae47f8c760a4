//! Wire-format messages for the real-time channel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Message kinds
// ---------------------------------------------------------------------------

/// The resolved kind of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Register,
    Data,
    Ping,
    Unknown,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Register => "register",
            MessageKind::Data => "data",
            MessageKind::Ping => "ping",
            MessageKind::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server message
// ---------------------------------------------------------------------------

/// A frame received from a client, after JSON parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `{"type":"register","companyId":"..."}`. `company_id` is `None` when the
    /// field is absent, empty, or not a string.
    Register { company_id: Option<String> },
    /// `{"type":"data","payload":<any>}`. A present `null` payload is `Some(Null)`.
    Data { payload: Option<Value> },
    /// `{"type":"ping"}`
    Ping,
    /// Valid JSON with a missing or unrecognised `type`.
    Unknown { type_name: Option<String> },
}

impl ClientMessage {
    /// Parse a text frame. Fails only if the frame is not JSON.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        let type_name = value.get("type").and_then(Value::as_str);

        let message = match type_name {
            Some("register") => ClientMessage::Register {
                company_id: value
                    .get("companyId")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_owned),
            },
            Some("data") => ClientMessage::Data {
                payload: value.get("payload").cloned(),
            },
            Some("ping") => ClientMessage::Ping,
            other => ClientMessage::Unknown {
                type_name: other.map(str::to_owned),
            },
        };

        Ok(message)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            ClientMessage::Register { .. } => MessageKind::Register,
            ClientMessage::Data { .. } => MessageKind::Data,
            ClientMessage::Ping => MessageKind::Ping,
            ClientMessage::Unknown { .. } => MessageKind::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client message
// ---------------------------------------------------------------------------

/// A message sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        message: String,
        #[serde(rename = "clientId")]
        client_id: String,
    },
    Registered {
        message: String,
        #[serde(rename = "companyId")]
        company_id: String,
    },
    Pong,
    DataProcessed {
        message: String,
        #[serde(rename = "downstreamResponse")]
        downstream_response: Value,
    },
    DataError {
        message: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    /// Greeting sent right after the transport is accepted.
    pub fn connected(client_id: &str) -> Self {
        ServerMessage::Connected {
            message: "Connected to iDataflow WebSocket server".to_string(),
            client_id: client_id.to_string(),
        }
    }

    pub fn registered(company_id: &str) -> Self {
        ServerMessage::Registered {
            message: format!("Successfully registered for company {company_id}"),
            company_id: company_id.to_string(),
        }
    }

    pub fn data_processed(downstream_response: Value) -> Self {
        ServerMessage::DataProcessed {
            message: "Data sent to n8n successfully".to_string(),
            downstream_response,
        }
    }

    pub fn data_error(message: impl Into<String>) -> Self {
        ServerMessage::DataError {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Transient record of one inbound frame, handed to the audit sink and, for
/// `data` messages, to the event forwarder.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub kind: MessageKind,
    /// The frame text exactly as received.
    pub raw: String,
    pub payload: Option<Value>,
    pub sender_id: String,
    /// Company bound to the sender when the frame arrived.
    pub company_id: Option<String>,
    pub received_at: DateTime<Utc>,
}
