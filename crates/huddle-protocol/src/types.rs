use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Role attached to an authenticated caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Activity data as shown to ordinary users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivitySummary {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub location: String,
    pub scheduled_at: DateTime<Utc>,
    pub description: String,
    pub capacity: i64,
    pub current_members: i64,
    pub available_slots: i64,
    pub channel_id: Uuid,
}

/// Activity data as shown to admins
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityAdminView {
    #[serde(flatten)]
    pub summary: ActivitySummary,
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Role-dependent activity representation.
///
/// The variant is chosen by the server from the caller's role, never from
/// which fields happen to be present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ActivityView {
    Summary(ActivitySummary),
    Admin(ActivityAdminView),
}

/// Admission record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipationData {
    pub activity_id: Uuid,
    pub user_id: Uuid,
    pub note: Option<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryData {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub slug: String,
    pub name: String,
    pub activity_count: i64,
}

/// Dashboard counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityStats {
    pub total_activities: i64,
    pub activities_today: i64,
    pub total_players: i64,
    pub category_count: i64,
    pub popular_categories: Vec<CategoryCount>,
}

/// Channel data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelData {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Channel with its resolved membership and latest message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelDetail {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub name: String,
    pub members: Vec<Uuid>,
    pub last_message: Option<MessageData>,
}

/// Message data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageData {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateActivityResponse {
    pub success: bool,
    pub activity: ActivitySummary,
    pub channel_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinResponse {
    pub success: bool,
    pub participation: ParticipationData,
    pub activity: ActivitySummary,
}

/// Error payload returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub success: bool,
    /// Machine-readable reason, e.g. `activity_full`
    pub code: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}
