use crate::auth::AuthUser;
use huddle_protocol::ServerMessage;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub user: AuthUser,
    pub subscribed_channels: HashSet<Uuid>,
}

/// Push routing for live connections. Holds no domain state: a subscription
/// is only ever created after the membership check has passed, and is torn
/// down when the membership it relied on goes away.
pub struct ConnectionManager {
    /// Map from connection ID to message sender channel
    senders: RwLock<HashMap<Uuid, mpsc::UnboundedSender<String>>>,
    /// Map from connection ID to connection info
    connection_info: RwLock<HashMap<Uuid, ConnectionInfo>>,
    /// Map from channel ID to connection IDs subscribed to that channel
    channel_subscribers: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            connection_info: RwLock::new(HashMap::new()),
            channel_subscribers: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_connection(
        &self,
        connection_id: Uuid,
        user: AuthUser,
        sender: mpsc::UnboundedSender<String>,
    ) {
        self.senders.write().await.insert(connection_id, sender);

        self.connection_info.write().await.insert(
            connection_id,
            ConnectionInfo {
                user,
                subscribed_channels: HashSet::new(),
            },
        );

        tracing::debug!(user_id = %user.user_id, %connection_id, "Connection registered");
    }

    pub async fn remove_connection(&self, connection_id: Uuid) {
        let info = self.connection_info.write().await.remove(&connection_id);

        if let Some(info) = info {
            let mut subscribers = self.channel_subscribers.write().await;
            for channel_id in &info.subscribed_channels {
                if let Some(subs) = subscribers.get_mut(channel_id) {
                    subs.remove(&connection_id);
                    if subs.is_empty() {
                        subscribers.remove(channel_id);
                    }
                }
            }

            tracing::debug!(user_id = %info.user.user_id, %connection_id, "Connection removed");
        }

        self.senders.write().await.remove(&connection_id);
    }

    pub async fn subscribe_to_channel(&self, connection_id: Uuid, channel_id: Uuid) {
        if let Some(info) = self.connection_info.write().await.get_mut(&connection_id) {
            info.subscribed_channels.insert(channel_id);
        }

        self.channel_subscribers
            .write()
            .await
            .entry(channel_id)
            .or_default()
            .insert(connection_id);

        tracing::debug!(%connection_id, %channel_id, "Subscribed to channel");
    }

    pub async fn unsubscribe_from_channel(&self, connection_id: Uuid, channel_id: Uuid) {
        if let Some(info) = self.connection_info.write().await.get_mut(&connection_id) {
            info.subscribed_channels.remove(&channel_id);
        }

        let mut subscribers = self.channel_subscribers.write().await;
        if let Some(subs) = subscribers.get_mut(&channel_id) {
            subs.remove(&connection_id);
            if subs.is_empty() {
                subscribers.remove(&channel_id);
            }
        }
    }

    /// Drop every subscription `user_id` holds on `channel_id` (after a withdrawal).
    pub async fn unsubscribe_user_from_channel(&self, user_id: Uuid, channel_id: Uuid) {
        let mut dropped = Vec::new();
        {
            let mut info = self.connection_info.write().await;
            for (connection_id, conn) in info.iter_mut() {
                if conn.user.user_id == user_id && conn.subscribed_channels.remove(&channel_id) {
                    dropped.push(*connection_id);
                }
            }
        }

        let mut subscribers = self.channel_subscribers.write().await;
        if let Some(subs) = subscribers.get_mut(&channel_id) {
            for connection_id in &dropped {
                subs.remove(connection_id);
            }
            if subs.is_empty() {
                subscribers.remove(&channel_id);
            }
        }

        if !dropped.is_empty() {
            tracing::debug!(%user_id, %channel_id, connections = dropped.len(), "Dropped subscriptions");
        }
    }

    /// Forget a deleted channel entirely.
    pub async fn close_channel(&self, channel_id: Uuid) {
        let removed = self.channel_subscribers.write().await.remove(&channel_id);

        if let Some(subs) = removed {
            let mut info = self.connection_info.write().await;
            for connection_id in subs {
                if let Some(conn) = info.get_mut(&connection_id) {
                    conn.subscribed_channels.remove(&channel_id);
                }
            }
        }
    }

    #[cfg(test)]
    pub async fn subscriber_count(&self, channel_id: Uuid) -> usize {
        self.channel_subscribers
            .read()
            .await
            .get(&channel_id)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    pub async fn broadcast_to_channel(&self, channel_id: Uuid, message: &ServerMessage) {
        let json = match serde_json::to_string(message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
                return;
            }
        };

        let subscribers = self.channel_subscribers.read().await;
        let senders = self.senders.read().await;

        if let Some(subs) = subscribers.get(&channel_id) {
            tracing::debug!("Broadcasting to {} subscribers of channel {}", subs.len(), channel_id);
            for conn_id in subs {
                if let Some(sender) = senders.get(conn_id) {
                    if let Err(e) = sender.send(json.clone()) {
                        tracing::error!("Failed to send message to {}: {}", conn_id, e);
                    }
                }
            }
        }
    }

    /// Like [`broadcast_to_channel`](Self::broadcast_to_channel), but a
    /// subscriber only receives the push if it is in `members` or is an admin.
    /// A subscription that outlived its membership gets nothing.
    pub async fn broadcast_to_members(
        &self,
        channel_id: Uuid,
        members: &HashSet<Uuid>,
        message: &ServerMessage,
    ) {
        let json = match serde_json::to_string(message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
                return;
            }
        };

        let subscribers = self.channel_subscribers.read().await;
        let info = self.connection_info.read().await;
        let senders = self.senders.read().await;

        let Some(subs) = subscribers.get(&channel_id) else {
            return;
        };

        for conn_id in subs {
            let allowed = info
                .get(conn_id)
                .is_some_and(|conn| conn.user.is_admin() || members.contains(&conn.user.user_id));
            if !allowed {
                tracing::debug!(connection_id = %conn_id, %channel_id, "Skipping push to non-member");
                continue;
            }
            if let Some(sender) = senders.get(conn_id) {
                if let Err(e) = sender.send(json.clone()) {
                    tracing::error!("Failed to send message to {}: {}", conn_id, e);
                }
            }
        }
    }

    pub async fn send_to_connection(&self, connection_id: Uuid, message: &ServerMessage) {
        let json = match serde_json::to_string(message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
                return;
            }
        };

        let senders = self.senders.read().await;

        if let Some(sender) = senders.get(&connection_id) {
            if let Err(e) = sender.send(json) {
                tracing::error!("Failed to send message to {}: {}", connection_id, e);
            }
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
