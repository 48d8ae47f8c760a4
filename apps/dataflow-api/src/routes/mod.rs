pub mod health;
pub mod websocket;

use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .nest("/api/websocket", websocket::router())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // WebSocket administration
        websocket::get_stats,
        websocket::list_logs,
        websocket::send_to_connection,
        websocket::send_to_company,
        websocket::broadcast,
        websocket::broadcast_to_company,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            // Gateway types
            crate::gateway::stats::StatsSnapshot,
            crate::gateway::stats::ConnectionStats,
            crate::gateway::audit::AuditRecord,
            // Route request/response types
            health::HealthResponse,
            websocket::OutboundMessageRequest,
            websocket::DeliveryResponse,
            websocket::LogsResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "WebSocket", description = "Real-time connection administration"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_admin_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/websocket/stats",
            "/api/websocket/logs",
            "/api/websocket/send/{connection_id}",
            "/api/websocket/companies/{company_id}/send",
            "/api/websocket/broadcast",
            "/api/websocket/companies/{company_id}/broadcast",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
