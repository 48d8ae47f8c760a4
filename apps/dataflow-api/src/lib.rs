pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;

use std::sync::Arc;

use auth::tokens::TokenVerifier;
use config::Config;
use gateway::audit::MemoryAuditLog;
use gateway::fanout::MessageRouter;
use gateway::forwarder::{EventForwarder, WebhookForwarder};
use gateway::handler::Dispatcher;
use gateway::registry::ConnectionRegistry;
use gateway::stats::StatsReporter;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: Arc<TokenVerifier>,
    pub connections: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub fanout: MessageRouter,
    pub stats: StatsReporter,
    pub audit: Arc<MemoryAuditLog>,
}

impl AppState {
    /// Build the state with a webhook forwarder pointed at `config.webhook_url`.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let forwarder = WebhookForwarder::new(&config.webhook_url, config.forward_timeout)?;
        Ok(Self::with_forwarder(config, Arc::new(forwarder)))
    }

    pub fn with_forwarder(config: Config, forwarder: Arc<dyn EventForwarder>) -> Self {
        let connections = Arc::new(ConnectionRegistry::new());
        let audit = Arc::new(MemoryAuditLog::new(config.audit_log_capacity));
        let dispatcher = Dispatcher::new(connections.clone(), forwarder, audit.clone());

        Self {
            tokens: Arc::new(TokenVerifier::from_config(&config)),
            config: Arc::new(config),
            fanout: MessageRouter::new(connections.clone()),
            stats: StatsReporter::new(connections.clone()),
            dispatcher: Arc::new(dispatcher),
            connections,
            audit,
        }
    }
}
