//! services/api/src/web/ws_handler.rs
//!
//! The entry point and receive loop for a notification WebSocket. The socket
//! is registered as the user's push channel for as long as the loop runs.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    push_channel::WsPushChannel,
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upgrades `GET /ws/notifications/{user_id}` to the user's push channel.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: String) {
    let (sender, mut receiver) = socket.split();
    let cancel = CancellationToken::new();
    let channel = Arc::new(WsPushChannel::new(sender, cancel.clone()));

    let connection_id = app_state
        .notifications
        .connect(&user_id, channel.clone())
        .await;
    info!(user_id, connection_id = %connection_id, "WebSocket connected.");

    let write_timeout = app_state.config.push_write_timeout;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(
                    user_id,
                    connection_id = %connection_id,
                    "WebSocket superseded or purged; closing."
                );
                break;
            }
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientMessage::parse(text.as_str()) {
                    ClientMessage::Ping => {
                        let pong_msg = ServerMessage::pong();
                        let pong = channel.send_json(&pong_msg);
                        let reply = tokio::time::timeout(write_timeout, pong).await;
                        if !matches!(reply, Ok(Ok(()))) {
                            warn!(user_id, "Failed to send pong; closing.");
                            break;
                        }
                    }
                    ClientMessage::Unknown => debug!(user_id, "Ignoring unrecognized message."),
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!(user_id, "WebSocket disconnected by client.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(user_id, error = %e, "WebSocket receive error.");
                    break;
                }
            }
        }
    }

    app_state
        .notifications
        .disconnect(&user_id, connection_id)
        .await;
    let _ = tokio::time::timeout(write_timeout, channel.send_close()).await;
}
