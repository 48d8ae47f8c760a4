//! WebSocket upgrade handler and per-connection read/write loops.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use dataflow_common::id::{prefix, prefixed_ulid};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::AppState;

use super::events::ServerMessage;
use super::session::{Connection, OutboundFrame};

/// Normal closure.
const CLOSE_NORMAL: u16 = 1000;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (ws_tx, ws_rx) = socket.split();

    let connection_id = prefixed_ulid(prefix::CLIENT);
    let (connection, outbound_rx) = Connection::channel(connection_id.clone());

    if let Err(e) = state.connections.register(connection.clone()) {
        tracing::error!(error = %e, "connection id collision; dropping socket");
        return;
    }

    let writer = tokio::spawn(write_loop(ws_tx, outbound_rx, connection_id.clone()));

    tracing::info!(
        %connection_id,
        total = state.connections.len(),
        "websocket connection opened"
    );

    connection.send(&ServerMessage::connected(&connection_id));

    run_connection(&state, &connection, ws_rx).await;

    // Unregister before the read loop's task ends. Dropping the last handle
    // lets the writer drain, send a close frame, and exit.
    state.connections.unregister(&connection_id);
    drop(connection);
    let _ = writer.await;

    tracing::info!(
        %connection_id,
        total = state.connections.len(),
        "websocket connection closed"
    );
}

/// Read frames until the client closes or the transport fails. Frames are
/// handled one at a time, so replies keep the order of the requests.
async fn run_connection(state: &AppState, connection: &Connection, mut ws_rx: SplitStream<WebSocket>) {
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = state.dispatcher.handle_text(&connection.id, text.as_str()).await;
                if let Some(reply) = reply {
                    if !connection.send(&reply) {
                        // Writer is gone; the transport has failed.
                        break;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(connection_id = %connection.id, "ignoring binary frame");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!(?e, connection_id = %connection.id, "ws read error");
                break;
            }
        }
    }
}

/// Sole owner of the socket's sending half.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    connection_id: String,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = ws_tx.send(Message::Text(frame.to_string().into())).await {
            tracing::debug!(?e, %connection_id, "ws write error");
            // Dropping the receiver marks the connection closed for senders.
            return;
        }
    }

    let _ = send_close(&mut ws_tx, CLOSE_NORMAL, "Connection closed").await;
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
