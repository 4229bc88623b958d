//! Live push channels, one per connected user.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{domain::NotificationEvent, ports::PushChannel};

pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Identifies one registration, so a stale connection tearing down cannot
/// remove the newer connection that superseded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone)]
struct Registered {
    id: ConnectionId,
    channel: Arc<dyn PushChannel>,
}

pub struct ConnectionRegistry {
    channels: RwLock<HashMap<String, Registered>>,
    write_timeout: Duration,
}

impl ConnectionRegistry {
    pub fn new(write_timeout: Duration) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            write_timeout,
        }
    }

    /// Makes `channel` the active one for `user_id`, closing whichever channel
    /// it replaces, then sends the `connection_established` greeting.
    pub async fn register(&self, user_id: &str, channel: Arc<dyn PushChannel>) -> ConnectionId {
        let id = ConnectionId::new();
        let replaced = {
            let mut channels = self.channels.write().await;
            let replaced = channels.insert(
                user_id.to_string(),
                Registered {
                    id,
                    channel: channel.clone(),
                },
            );
            info!(
                user_id,
                connection_id = %id,
                total_connections = channels.len(),
                "Push channel registered."
            );
            replaced
        };
        if let Some(old) = replaced {
            info!(user_id, connection_id = %old.id, "Closing superseded push channel.");
            old.channel.close().await;
        }

        self.send(user_id, &NotificationEvent::connection_established())
            .await;
        id
    }

    /// Pushes `event` to the user's channel. A failed or timed-out write purges
    /// the channel; nothing is retried.
    pub async fn send(&self, user_id: &str, event: &NotificationEvent) -> bool {
        let Some(registered) = self.channels.read().await.get(user_id).cloned() else {
            return false;
        };

        let failure = match tokio::time::timeout(self.write_timeout, registered.channel.push(event))
            .await
        {
            Ok(Ok(())) => {
                info!(user_id, event_type = event.type_name(), "Notification sent.");
                return true;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("write timed out after {:?}", self.write_timeout),
        };

        warn!(
            user_id,
            event_type = event.type_name(),
            error = %failure,
            "Failed to push notification; dropping channel."
        );
        self.unregister_connection(user_id, registered.id).await;
        false
    }

    /// Best-effort delivery to every connected user except `exclude`.
    pub async fn broadcast(&self, event: &NotificationEvent, exclude: Option<&str>) -> usize {
        let users: Vec<String> = self
            .channels
            .read()
            .await
            .keys()
            .filter(|user| Some(user.as_str()) != exclude)
            .cloned()
            .collect();

        let mut delivered = 0;
        for user in users {
            if self.send(&user, event).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Removes and closes the user's channel, whichever it is. Idempotent.
    pub async fn unregister(&self, user_id: &str) -> bool {
        let removed = self.channels.write().await.remove(user_id);
        match removed {
            Some(old) => {
                old.channel.close().await;
                info!(user_id, "Push channel unregistered.");
                true
            }
            None => false,
        }
    }

    /// Removes the user's channel only if it is still the registration `id`.
    pub async fn unregister_connection(&self, user_id: &str, id: ConnectionId) -> bool {
        let removed = {
            let mut channels = self.channels.write().await;
            match channels.get(user_id) {
                Some(current) if current.id == id => channels.remove(user_id),
                _ => None,
            }
        };
        match removed {
            Some(old) => {
                old.channel.close().await;
                info!(user_id, connection_id = %id, "Push channel unregistered.");
                true
            }
            None => false,
        }
    }

    pub async fn is_connected(&self, user_id: &str) -> bool {
        self.channels.read().await.contains_key(user_id)
    }

    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_TIMEOUT)
    }
}
