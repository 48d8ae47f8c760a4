#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use dataflow_api::config::Config;
use dataflow_api::AppState;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const JWT_ISSUER: &str = "iDataflow";
pub const JWT_AUDIENCE: &str = "iDataflow-users";

/// Nothing listens on the discard port, so forwards fail fast.
pub const UNREACHABLE_WEBHOOK: &str = "http://127.0.0.1:9/webhook";

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn test_config(webhook_url: &str) -> Config {
    Config {
        port: 0,
        webhook_url: webhook_url.to_string(),
        forward_timeout: Duration::from_secs(5),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_issuer: JWT_ISSUER.to_string(),
        jwt_audience: JWT_AUDIENCE.to_string(),
        audit_log_capacity: 1000,
    }
}

/// Build the full router and its state, forwarding to `webhook_url`.
pub fn test_app(webhook_url: &str) -> (Router, AppState) {
    test_app_with(test_config(webhook_url))
}

pub fn test_app_with(config: Config) -> (Router, AppState) {
    let state = AppState::new(config).expect("build state");
    let app = dataflow_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Start a real TCP server so WebSocket clients can connect.
pub async fn start_server(webhook_url: &str) -> (SocketAddr, AppState) {
    start_server_with(test_config(webhook_url)).await
}

pub async fn start_server_with(config: Config) -> (SocketAddr, AppState) {
    let (app, state) = test_app_with(config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

pub fn mint_token(user_id: &str, role: &str) -> String {
    let claims = json!({
        "sub": user_id,
        "username": user_id,
        "role": role,
        "iss": JWT_ISSUER,
        "aud": JWT_AUDIENCE,
        "exp": chrono::Utc::now().timestamp() + 300,
    });
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("mint test token")
}

pub fn admin_token() -> String {
    mint_token("usr_admin", "admin")
}

pub fn user_token() -> String {
    mint_token("usr_member", "user")
}

// ---------------------------------------------------------------------------
// Mock workflow webhook
// ---------------------------------------------------------------------------

/// Records every request body and answers 200 with a JSON ack, or 500 when
/// failing is switched on. A configured delay stalls every answer.
#[derive(Clone, Default)]
pub struct MockWebhook {
    bodies: Arc<Mutex<Vec<Value>>>,
    failing: Arc<AtomicBool>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockWebhook {
    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }
}

async fn webhook(State(mock): State<MockWebhook>, Json(body): Json<Value>) -> Response {
    mock.bodies.lock().push(body);
    let delay = *mock.delay.lock();
    if let Some(delay) = delay {
        time::sleep(delay).await;
    }
    if mock.failing.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "workflow crashed").into_response();
    }
    Json(json!({ "received": true })).into_response()
}

/// Start the mock webhook. Returns its URL and a handle for inspection.
pub async fn start_mock_webhook() -> (String, MockWebhook) {
    let mock = MockWebhook::default();
    let app = Router::new()
        .route("/webhook", post(webhook))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/webhook"), mock)
}

// ---------------------------------------------------------------------------
// WebSocket client helpers
// ---------------------------------------------------------------------------

/// Connect to `/ws` and consume the `connected` greeting.
/// Returns the stream and the assigned client id.
pub async fn connect(addr: SocketAddr) -> (WsStream, String) {
    let url = format!("ws://{addr}/ws");
    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");

    let greeting = recv_json(&mut ws).await;
    assert_eq!(greeting["type"], "connected");
    let client_id = greeting["clientId"]
        .as_str()
        .expect("clientId present")
        .to_string();

    (ws, client_id)
}

pub async fn send_json(ws: &mut WsStream, value: Value) {
    send_text(ws, &value.to_string()).await;
}

pub async fn send_text(ws: &mut WsStream, text: &str) {
    ws.send(tungstenite::Message::Text(text.to_string().into()))
        .await
        .expect("ws send");
}

/// Next text frame as JSON. Fails the test after 5 seconds.
pub async fn recv_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream ended")
            .expect("ws read error");

        if let tungstenite::Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("parse server message");
        }
    }
}

/// Asserts that no text frame arrives within `wait`.
pub async fn assert_silent(ws: &mut WsStream, wait: Duration) {
    if let Ok(Some(Ok(tungstenite::Message::Text(text)))) = time::timeout(wait, ws.next()).await {
        panic!("unexpected message: {}", text.as_str());
    }
}

/// Register the connection under `company_id` and consume the ack.
pub async fn register(ws: &mut WsStream, company_id: &str) {
    send_json(ws, json!({ "type": "register", "companyId": company_id })).await;
    let ack = recv_json(ws).await;
    assert_eq!(ack["type"], "registered");
    assert_eq!(ack["companyId"], company_id);
}

/// Poll until the registry holds `expected` connections.
pub async fn wait_for_connections(state: &AppState, expected: usize) {
    let deadline = time::Instant::now() + Duration::from_secs(5);
    while state.connections.len() != expected {
        assert!(
            time::Instant::now() < deadline,
            "expected {expected} connections, have {}",
            state.connections.len()
        );
        time::sleep(Duration::from_millis(10)).await;
    }
}
