//! Administrative endpoints under `/api/websocket`.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::auth::middleware::{AdminUser, AuthUser};
use crate::error::{ApiError, ApiErrorBody};
use crate::gateway::audit::{AuditRecord, MAX_PAGE_SIZE};
use crate::gateway::stats::StatsSnapshot;
use crate::AppState;

/// Default page size for `GET /logs`.
const DEFAULT_LOG_LIMIT: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/logs", get(list_logs))
        .route("/send/{connection_id}", post(send_to_connection))
        .route("/companies/{company_id}/send", post(send_to_company))
        .route("/broadcast", post(broadcast))
        .route("/companies/{company_id}/broadcast", post(broadcast_to_company))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OutboundMessageRequest {
    /// Arbitrary JSON delivered to the client(s) as-is.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub message: Value,
}

impl OutboundMessageRequest {
    fn into_message(self) -> Result<Value, ApiError> {
        if self.message.is_null() {
            return Err(ApiError::bad_request("Message is required"));
        }
        Ok(self.message)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryResponse {
    pub message: String,
}

impl DeliveryResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// GET /api/websocket/stats
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/websocket/stats",
    tag = "WebSocket",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Connection statistics", body = StatsSnapshot),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn get_stats(_user: AuthUser, State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

// ---------------------------------------------------------------------------
// GET /api/websocket/logs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LogsParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogsResponse {
    pub data: Vec<AuditRecord>,
    pub has_more: bool,
}

#[utoipa::path(
    get,
    path = "/api/websocket/logs",
    tag = "WebSocket",
    security(("bearer" = [])),
    params(
        ("limit" = Option<usize>, Query, description = "Number of records (1-1000, default 100)"),
        ("offset" = Option<usize>, Query, description = "Records to skip, newest first"),
    ),
    responses(
        (status = 200, description = "Recent inbound messages", body = LogsResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn list_logs(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LogsParams>,
) -> Json<LogsResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let data = state.audit.recent(limit, offset);
    let has_more = offset.saturating_add(data.len()) < state.audit.len();

    Json(LogsResponse { data, has_more })
}

// ---------------------------------------------------------------------------
// POST /api/websocket/send/:connection_id
// ---------------------------------------------------------------------------

/// Best effort: succeeds even if the connection does not exist.
#[utoipa::path(
    post,
    path = "/api/websocket/send/{connection_id}",
    tag = "WebSocket",
    security(("bearer" = [])),
    params(("connection_id" = String, Path, description = "Connection ID")),
    request_body = OutboundMessageRequest,
    responses(
        (status = 200, description = "Message queued", body = DeliveryResponse),
        (status = 400, description = "Missing message", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
    ),
)]
pub async fn send_to_connection(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
    Json(body): Json<OutboundMessageRequest>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    let message = body.into_message()?;
    state.fanout.send_to(&connection_id, &message);

    tracing::info!(admin = %admin.user_id, %connection_id, "admin message sent");

    Ok(DeliveryResponse::new("Message sent successfully"))
}

// ---------------------------------------------------------------------------
// POST /api/websocket/companies/:company_id/send
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/websocket/companies/{company_id}/send",
    tag = "WebSocket",
    security(("bearer" = [])),
    params(("company_id" = String, Path, description = "Company ID")),
    request_body = OutboundMessageRequest,
    responses(
        (status = 200, description = "Message queued", body = DeliveryResponse),
        (status = 400, description = "Missing message", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
        (status = 404, description = "No open connection for company", body = ApiErrorBody),
    ),
)]
pub async fn send_to_company(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Json(body): Json<OutboundMessageRequest>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    let message = body.into_message()?;

    let connection = state
        .connections
        .lookup_by_group(&company_id)
        .filter(|c| c.is_open())
        .ok_or_else(|| ApiError::not_found("Company WebSocket connection not found"))?;

    state.fanout.send_to(&connection.id, &message);

    tracing::info!(
        admin = %admin.user_id,
        %company_id,
        connection_id = %connection.id,
        "admin message sent to company"
    );

    Ok(DeliveryResponse::new("Message sent successfully"))
}

// ---------------------------------------------------------------------------
// POST /api/websocket/broadcast
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/websocket/broadcast",
    tag = "WebSocket",
    security(("bearer" = [])),
    request_body = OutboundMessageRequest,
    responses(
        (status = 200, description = "Message broadcast", body = DeliveryResponse),
        (status = 400, description = "Missing message", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
    ),
)]
pub async fn broadcast(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(body): Json<OutboundMessageRequest>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    let message = body.into_message()?;
    state.fanout.broadcast_all(&message);

    tracing::info!(admin = %admin.user_id, "admin broadcast sent");

    Ok(DeliveryResponse::new("Message broadcasted successfully"))
}

// ---------------------------------------------------------------------------
// POST /api/websocket/companies/:company_id/broadcast
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/websocket/companies/{company_id}/broadcast",
    tag = "WebSocket",
    security(("bearer" = [])),
    params(("company_id" = String, Path, description = "Company ID")),
    request_body = OutboundMessageRequest,
    responses(
        (status = 200, description = "Message broadcast", body = DeliveryResponse),
        (status = 400, description = "Missing message", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Forbidden", body = ApiErrorBody),
    ),
)]
pub async fn broadcast_to_company(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Json(body): Json<OutboundMessageRequest>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    let message = body.into_message()?;
    state.fanout.broadcast_to_group(&company_id, &message);

    tracing::info!(admin = %admin.user_id, %company_id, "admin company broadcast sent");

    Ok(DeliveryResponse::new("Message broadcasted successfully"))
}
