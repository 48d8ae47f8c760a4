//! Relays client `data` messages to the workflow engine's webhook.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::events::Envelope;

/// Company id reported for senders that never sent `register`.
pub const UNREGISTERED_COMPANY: &str = "unregistered";

/// Why a forward attempt failed. The `Display` text is sent back to the
/// client in a `data_error` reply.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The webhook answered with a non-2xx status.
    #[error("Failed to send to n8n: {status}")]
    Status { status: StatusCode, body: String },
    /// Timeout, refused connection, DNS failure, or an unreadable response.
    #[error("Error sending data to n8n: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Destination for client-submitted data.
///
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait EventForwarder: Send + Sync {
    /// Forward a `data` envelope and return the downstream response body.
    async fn forward(&self, envelope: &Envelope) -> Result<Value, ForwardError>;
}

/// JSON body POSTed to the webhook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent<'a> {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub company_id: &'a str,
    pub client_id: &'a str,
    pub timestamp: String,
    pub payload: Option<&'a Value>,
}

impl<'a> WebhookEvent<'a> {
    pub fn from_envelope(envelope: &'a Envelope) -> Self {
        Self {
            event_type: "websocket_data",
            company_id: envelope.company_id.as_deref().unwrap_or(UNREGISTERED_COMPANY),
            client_id: &envelope.sender_id,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            payload: envelope.payload.as_ref(),
        }
    }
}

/// Forwards envelopes to an HTTP webhook with a bounded request timeout.
#[derive(Clone)]
pub struct WebhookForwarder {
    url: String,
    http: reqwest::Client,
}

impl WebhookForwarder {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            http,
        })
    }
}

#[async_trait]
impl EventForwarder for WebhookForwarder {
    async fn forward(&self, envelope: &Envelope) -> Result<Value, ForwardError> {
        let event = WebhookEvent::from_envelope(envelope);

        tracing::debug!(
            url = %self.url,
            client_id = %event.client_id,
            company_id = %event.company_id,
            "forwarding data to webhook"
        );

        let response = self.http.post(&self.url).json(&event).send().await?;
        let status = response.status();

        if !status.is_success() {
            // Keep the status even if the body cannot be read.
            let body = response.text().await.unwrap_or_default();
            return Err(ForwardError::Status { status, body });
        }

        Ok(parse_body(response.text().await?))
    }
}

/// JSON bodies are passed through as JSON; anything else as a string.
fn parse_body(body: String) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}
