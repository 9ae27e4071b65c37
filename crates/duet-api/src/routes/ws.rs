//! WebSocket endpoint.
//!
//! Each socket gets a connection id, a reader loop that forwards parsed
//! frames to the coordinator and a writer task that drains the
//! connection's outbox onto the socket. The coordinator holds the only
//! strong outbox sender, so when it drops a stalled connection the writer
//! finishes and the socket is closed.

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use duet_core::ids::ConnectionId;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::gateway::outbox;
use crate::gateway::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::new();
    info!(%connection_id, "websocket connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbox, mut outbox_rx) = outbox();
    let replies = outbox.downgrade();

    if state.gateway.connect(connection_id, outbox).await.is_err() {
        error!(%connection_id, "coordinator unavailable, dropping socket");
        return;
    }

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbox_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    error!("failed to serialize frame: {e}");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                debug!("websocket send failed, client gone");
                break;
            }
        }
    });

    loop {
        let result = tokio::select! {
            next = ws_rx.next() => match next {
                Some(result) => result,
                None => break,
            },
            _ = &mut writer => {
                debug!(%connection_id, "writer finished, closing socket");
                break;
            }
        };
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(%connection_id, "websocket error: {e}");
                break;
            }
        };

        let message: ClientMessage = match serde_json::from_str(text.as_str()) {
            Ok(message) => message,
            Err(e) => {
                debug!(%connection_id, "unparseable frame: {e}");
                if let Some(outbox) = replies.upgrade() {
                    let _ = outbox.try_send(ServerMessage::parse_error(&e));
                }
                continue;
            }
        };

        if state.gateway.dispatch(connection_id, message).await.is_err() {
            error!(%connection_id, "coordinator stopped, closing socket");
            break;
        }
    }

    let _ = state.gateway.disconnect(connection_id).await;
    writer.abort();
    info!(%connection_id, "websocket closed");
}

/// Returns the WebSocket router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}
