//! Audit trail of inbound frames.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dataflow_common::SnowflakeGenerator;
use parking_lot::Mutex;
use serde::Serialize;
use utoipa::ToSchema;

use super::events::Envelope;

/// Upper bound on records returned by a single `recent` call.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Receives every inbound envelope, whatever the dispatcher did with it.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, envelope: &Envelope);
}

/// One stored audit entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Snowflake id, serialized as a string.
    pub id: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    /// `register`, `data`, `ping`, or `unknown`.
    pub message_type: String,
    /// Raw frame text.
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// Bounded in-memory audit log. The oldest records are evicted first.
pub struct MemoryAuditLog {
    records: Mutex<VecDeque<AuditRecord>>,
    capacity: usize,
    ids: SnowflakeGenerator,
}

impl MemoryAuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(MAX_PAGE_SIZE))),
            capacity: capacity.max(1),
            ids: SnowflakeGenerator::new(0),
        }
    }

    /// Newest-first page of records.
    pub fn recent(&self, limit: usize, offset: usize) -> Vec<AuditRecord> {
        let records = self.records.lock();
        records
            .iter()
            .rev()
            .skip(offset)
            .take(limit.min(MAX_PAGE_SIZE))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, envelope: &Envelope) {
        let record = AuditRecord {
            id: self.ids.generate().to_string(),
            client_id: envelope.sender_id.clone(),
            company_id: envelope.company_id.clone(),
            message_type: envelope.kind.as_str().to_string(),
            payload: envelope.raw.clone(),
            created_at: envelope.received_at,
        };

        tracing::debug!(
            client_id = %record.client_id,
            message_type = %record.message_type,
            "audit record"
        );

        let mut records = self.records.lock();
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::events::MessageKind;

    fn envelope(kind: MessageKind, raw: &str) -> Envelope {
        Envelope {
            kind,
            raw: raw.to_string(),
            payload: None,
            sender_id: "client_1".to_string(),
            company_id: None,
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn records_are_returned_newest_first() {
        let log = MemoryAuditLog::new(10);
        log.record(&envelope(MessageKind::Ping, "first")).await;
        log.record(&envelope(MessageKind::Unknown, "second")).await;

        let recent = log.recent(10, 0);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].payload, "second");
        assert_eq!(recent[0].message_type, "unknown");
        assert_eq!(recent[1].message_type, "ping");
        assert_ne!(recent[0].id, recent[1].id);
    }

    #[tokio::test]
    async fn evicts_oldest_when_over_capacity() {
        let log = MemoryAuditLog::new(3);
        for i in 0..5 {
            log.record(&envelope(MessageKind::Ping, &i.to_string())).await;
        }
        assert_eq!(log.len(), 3);
        let payloads: Vec<String> = log.recent(10, 0).into_iter().map(|r| r.payload).collect();
        assert_eq!(payloads, vec!["4", "3", "2"]);
    }

    #[tokio::test]
    async fn paging_with_offset() {
        let log = MemoryAuditLog::new(100);
        for i in 0..10 {
            log.record(&envelope(MessageKind::Data, &i.to_string())).await;
        }
        let page: Vec<String> = log.recent(3, 2).into_iter().map(|r| r.payload).collect();
        assert_eq!(page, vec!["7", "6", "5"]);
        assert!(log.recent(5, 50).is_empty());
    }
}
