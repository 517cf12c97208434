use chrono::{DateTime, Utc};
use huddle_protocol::ChannelData;
use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Channel {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Channel> for ChannelData {
    fn from(c: Channel) -> Self {
        ChannelData {
            id: c.id,
            activity_id: c.activity_id,
            name: c.name,
            created_at: c.created_at,
        }
    }
}

/// Default display name for an activity's channel
pub fn default_channel_name(activity_title: &str) -> String {
    format!("Group {}", activity_title)
}

#[derive(Debug, Deserialize)]
pub struct UpdateChannel {
    pub name: Option<String>,
}
