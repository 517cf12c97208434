use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::MessageData;

/// Messages sent from client to server via WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate with the server
    Authenticate { token: String },

    /// Subscribe to channel updates (members and admins only)
    SubscribeChannel { channel_id: Uuid },

    /// Unsubscribe from channel updates
    UnsubscribeChannel { channel_id: Uuid },

    /// Ping to keep connection alive
    Ping,
}

/// Messages sent from server to client via WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication successful
    Authenticated { connection_id: Uuid },

    /// Error message
    Error { code: String, message: String },

    /// Pong response to ping
    Pong,

    /// Subscribed to channel
    ChannelSubscribed { channel_id: Uuid },

    /// New message posted
    MessageCreated { message: MessageData },

    /// One message (`message_id` set) or every message in the channel was removed
    MessagesDeleted {
        channel_id: Uuid,
        message_id: Option<Uuid>,
    },

    /// Channel display name changed
    ChannelRenamed { channel_id: Uuid, name: String },

    /// A user joined the channel's activity
    MemberJoined {
        channel_id: Uuid,
        activity_id: Uuid,
        user_id: Uuid,
    },

    /// A user withdrew from the channel's activity
    MemberLeft {
        channel_id: Uuid,
        activity_id: Uuid,
        user_id: Uuid,
    },

    /// The activity was deleted; the channel no longer exists
    ChannelDeleted { channel_id: Uuid, activity_id: Uuid },
}
