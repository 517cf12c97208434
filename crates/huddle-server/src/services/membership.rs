//! Channel membership is never stored; it is whatever the participation
//! rows of the owning activity say it is. Every lookup here is an index hit
//! on `participations (activity_id, user_id)` or `participations (user_id)`.

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::models::Channel;
use sqlx::SqlitePool;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Clone)]
pub struct MembershipService {
    db: SqlitePool,
}

impl MembershipService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn is_member(&self, activity_id: Uuid, user_id: Uuid) -> Result<bool> {
        let is_member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM participations WHERE activity_id = ? AND user_id = ?)",
        )
        .bind(activity_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(is_member)
    }

    /// Members of an activity in join order
    pub async fn list_members(&self, activity_id: Uuid) -> Result<Vec<Uuid>> {
        let members = sqlx::query_scalar(
            r#"
            SELECT user_id FROM participations
            WHERE activity_id = ?
            ORDER BY joined_at, rowid
            "#,
        )
        .bind(activity_id)
        .fetch_all(&self.db)
        .await?;

        Ok(members)
    }

    /// Activities the user participates in, in join order
    pub async fn list_memberships(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let activities = sqlx::query_scalar(
            r#"
            SELECT activity_id FROM participations
            WHERE user_id = ?
            ORDER BY joined_at, rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(activities)
    }

    /// Users whose participation currently grants access to a channel.
    pub async fn channel_members(&self, channel_id: Uuid) -> Result<HashSet<Uuid>> {
        let members: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT p.user_id FROM participations p
            JOIN channels c ON c.activity_id = p.activity_id
            WHERE c.id = ?
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.db)
        .await?;

        Ok(members.into_iter().collect())
    }

    /// Resolve a channel and check the caller may read or write it.
    pub async fn authorize_channel(&self, channel_id: Uuid, caller: &AuthUser) -> Result<Channel> {
        let channel = sqlx::query_as::<_, Channel>(
            "SELECT id, activity_id, name, created_at FROM channels WHERE id = ?",
        )
        .bind(channel_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Channel not found".to_string()))?;

        if caller.is_admin() || self.is_member(channel.activity_id, caller.user_id).await? {
            Ok(channel)
        } else {
            tracing::debug!(%channel_id, user_id = %caller.user_id, "Channel access denied");
            Err(AppError::Forbidden)
        }
    }

    /// Same gate as [`authorize_channel`](Self::authorize_channel), keyed by activity.
    pub async fn authorize_activity(&self, activity_id: Uuid, caller: &AuthUser) -> Result<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM activities WHERE id = ?)")
            .bind(activity_id)
            .fetch_one(&self.db)
            .await?;

        if !exists {
            return Err(AppError::NotFound("Activity not found".to_string()));
        }

        if caller.is_admin() || self.is_member(activity_id, caller.user_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}
