//! Point-in-time connection statistics.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::registry::ConnectionRegistry;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_connections: usize,
    /// Connections that have bound a company key.
    pub registered_connections: usize,
    pub entries: Vec<ConnectionStats>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    pub connected_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct StatsReporter {
    registry: Arc<ConnectionRegistry>,
}

impl StatsReporter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Built from a single registry snapshot, so counts and entries agree.
    pub fn snapshot(&self) -> StatsSnapshot {
        let entries: Vec<ConnectionStats> = self
            .registry
            .snapshot(|_| true)
            .into_iter()
            .map(|c| ConnectionStats {
                group_key: c.company_id().map(str::to_owned),
                id: c.id,
                connected_at: c.connected_at,
            })
            .collect();

        StatsSnapshot {
            total_connections: entries.len(),
            registered_connections: entries.iter().filter(|e| e.group_key.is_some()).count(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::session::Connection;

    #[test]
    fn empty_registry() {
        let stats = StatsReporter::new(Arc::new(ConnectionRegistry::new())).snapshot();
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.registered_connections, 0);
        assert!(stats.entries.is_empty());
    }

    #[test]
    fn counts_registered_and_total() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut receivers = Vec::new();
        for id in ["a", "b", "c"] {
            let (conn, rx) = Connection::channel(id.to_string());
            registry.register(conn).unwrap();
            receivers.push(rx);
        }
        registry.bind_group("a", "acme").unwrap();
        registry.bind_group("c", "acme").unwrap();

        let stats = StatsReporter::new(registry).snapshot();
        assert_eq!(stats.total_connections, 3);
        // Both keep their company even though only "c" is addressable.
        assert_eq!(stats.registered_connections, 2);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalConnections"], 3);
        let b = json["entries"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["id"] == "b")
            .unwrap();
        assert!(b.get("groupKey").is_none());
        assert!(b["connectedAt"].is_string());
    }
}
