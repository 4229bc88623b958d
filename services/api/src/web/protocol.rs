//! services/api/src/web/protocol.rs
//!
//! Defines the control messages exchanged on the notification WebSocket.
//! Notifications themselves are sent as serialized `NotificationEvent`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedClientMessage {
    Ping,
}

/// The text messages the server understands. Anything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Ping,
    Unknown,
}

impl ClientMessage {
    /// Accepts the literal `ping` as well as `{"type": "ping"}`.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text == "ping" {
            return Self::Ping;
        }
        match serde_json::from_str::<TaggedClientMessage>(text) {
            Ok(TaggedClientMessage::Ping) => Self::Ping,
            Err(_) => Self::Unknown,
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to a client `ping`.
    Pong { timestamp: DateTime<Utc> },
}

impl ServerMessage {
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: Utc::now(),
        }
    }
}
