use chrono::{DateTime, Utc};
use huddle_protocol::{ActivitySummary, CategoryData, ParticipationData};
use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Column list for selecting an [`Activity`] from `activities a JOIN channels c`.
pub const ACTIVITY_COLUMNS: &str = "a.id, a.title, a.category, a.location, a.description, \
     a.scheduled_at, a.capacity, a.member_count, a.created_at, c.id AS channel_id";

#[derive(Debug, Clone, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub location: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub capacity: i64,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub channel_id: Uuid,
}

impl Activity {
    pub fn available_slots(&self) -> i64 {
        (self.capacity - self.member_count).max(0)
    }

    pub fn summary(&self) -> ActivitySummary {
        ActivitySummary {
            id: self.id,
            title: self.title.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            scheduled_at: self.scheduled_at,
            description: self.description.clone(),
            capacity: self.capacity,
            current_members: self.member_count,
            available_slots: self.available_slots(),
            channel_id: self.channel_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Participation {
    pub activity_id: Uuid,
    pub user_id: Uuid,
    pub note: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl From<Participation> for ParticipationData {
    fn from(p: Participation) -> Self {
        ParticipationData {
            activity_id: p.activity_id,
            user_id: p.user_id,
            note: p.note,
            joined_at: p.joined_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub slug: String,
    pub name: String,
}

impl From<Category> for CategoryData {
    fn from(c: Category) -> Self {
        CategoryData {
            slug: c.slug,
            name: c.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateActivity {
    pub title: String,
    pub category: String,
    pub location: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    pub capacity: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinActivity {
    pub note: Option<String>,
}

/// Time window for discovery, always starting at the beginning of today (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum When {
    Today,
    Week,
    Month,
}

impl When {
    pub fn days(self) -> i64 {
        match self {
            When::Today => 1,
            When::Week => 8,
            When::Month => 31,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub category: Option<String>,
    pub keyword: Option<String>,
    pub when: Option<When>,
    #[serde(default)]
    pub available_only: bool,
}

/// Ids removed by an activity deletion, used for fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletedActivity {
    pub activity_id: Uuid,
    pub channel_id: Uuid,
}
