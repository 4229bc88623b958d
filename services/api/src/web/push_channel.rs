//! services/api/src/web/push_channel.rs
//!
//! The WebSocket implementation of the `PushChannel` port. The write half of
//! the socket is shared between the registry (notifications) and the socket's
//! own receive loop (pong replies), so it sits behind a mutex.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use companion_core::{
    ports::{PortError, PortResult, PushChannel},
    NotificationEvent,
};
use futures::{stream::SplitSink, SinkExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

pub struct WsPushChannel {
    sender: WsSender,
    cancel: CancellationToken,
}

impl WsPushChannel {
    pub fn new(sender: SplitSink<WebSocket, Message>, cancel: CancellationToken) -> Self {
        Self {
            sender: Arc::new(Mutex::new(sender)),
            cancel,
        }
    }

    /// Serializes `message` and writes it as one text frame.
    pub async fn send_json<T: Serialize>(&self, message: &T) -> PortResult<()> {
        let json =
            serde_json::to_string(message).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.sender
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))
    }

    /// Sends a close frame. Errors are ignored; the peer may already be gone.
    pub async fn send_close(&self) {
        let _ = self.sender.lock().await.send(Message::Close(None)).await;
    }
}

#[async_trait]
impl PushChannel for WsPushChannel {
    async fn push(&self, event: &NotificationEvent) -> PortResult<()> {
        if self.cancel.is_cancelled() {
            return Err(PortError::Unavailable("channel closed".to_string()));
        }
        self.send_json(event).await
    }

    /// Stops the socket's receive loop, which then sends the close frame.
    async fn close(&self) {
        self.cancel.cancel();
    }
}
