//! Registry of live connections, addressable by connection id and by company.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use super::session::Connection;

/// Contract violations reported by the registry.
///
/// Neither is expected at runtime: connection ids are ULIDs and every
/// `bind_group` call comes from the connection's own read loop while it is
/// still registered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("connection {0} is already registered")]
    DuplicateId(String),
    #[error("connection {0} is not registered")]
    NotFound(String),
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<String, Connection>,
    /// company id → connection id. Last register wins.
    companies: HashMap<String, String>,
}

/// Shared registry of all live connections.
///
/// Both indexes sit behind one `parking_lot::RwLock`, so every operation is
/// linearizable and a snapshot never sees a connection half-added or
/// half-removed. No operation performs transport I/O while holding the lock.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly accepted connection.
    pub fn register(&self, connection: Connection) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        match inner.connections.entry(connection.id.clone()) {
            Entry::Occupied(existing) => Err(RegistryError::DuplicateId(existing.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(connection);
                Ok(())
            }
        }
    }

    /// Remove a connection. Its company mapping is dropped only if it still
    /// points at this connection, so a stale unregister cannot evict a newer
    /// registrant of the same company.
    pub fn unregister(&self, id: &str) -> Option<Connection> {
        let mut inner = self.inner.write();
        let removed = inner.connections.remove(id)?;
        if let Some(company_id) = removed.company_id() {
            if inner.companies.get(company_id).is_some_and(|bound| bound == id) {
                inner.companies.remove(company_id);
            }
        }
        Some(removed)
    }

    /// Bind a connection to a company key, overwriting any other connection's
    /// claim on that key.
    ///
    /// Returns the id of the connection that lost addressability, if any. The
    /// displaced connection keeps its own `company_id` and is not notified.
    pub fn bind_group(&self, id: &str, company_id: &str) -> Result<Option<String>, RegistryError> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let connection = inner
            .connections
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let previous = connection.company_id.replace(company_id.to_string());

        // Re-registering under a new company releases the old key.
        if let Some(previous) = previous.filter(|p| p != company_id) {
            if inner.companies.get(&previous).is_some_and(|bound| bound == id) {
                inner.companies.remove(&previous);
            }
        }

        let displaced = inner
            .companies
            .insert(company_id.to_string(), id.to_string())
            .filter(|other| other != id);
        Ok(displaced)
    }

    pub fn lookup_by_id(&self, id: &str) -> Option<Connection> {
        self.inner.read().connections.get(id).cloned()
    }

    /// The connection currently addressable under `company_id`.
    pub fn lookup_by_group(&self, company_id: &str) -> Option<Connection> {
        let inner = self.inner.read();
        let id = inner.companies.get(company_id)?;
        inner.connections.get(id).cloned()
    }

    /// Copy every connection matching `predicate`, ordered by connection time
    /// and then id. Taken under a single read lock.
    pub fn snapshot<F>(&self, predicate: F) -> Vec<Connection>
    where
        F: Fn(&Connection) -> bool,
    {
        let mut matching: Vec<Connection> = {
            let inner = self.inner.read();
            inner
                .connections
                .values()
                .filter(|c| predicate(*c))
                .cloned()
                .collect()
        };
        matching.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        matching
    }

    pub fn len(&self) -> usize {
        self.inner.read().connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
