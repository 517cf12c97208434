use chrono::{DateTime, Utc};
use huddle_protocol::MessageData;
use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub seq: i64,
    pub id: Uuid,
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageData {
    fn from(m: Message) -> Self {
        MessageData {
            id: m.id,
            channel_id: m.channel_id,
            author_id: m.author_id,
            body: m.body,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMessage {
    pub body: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListMessages {
    pub before: Option<Uuid>,
    pub limit: Option<i64>,
}

impl ListMessages {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 100;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}
