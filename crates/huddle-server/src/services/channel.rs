use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::models::Channel;
use crate::services::membership::MembershipService;
use crate::services::message::MessageService;
use huddle_protocol::ChannelDetail;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ChannelService {
    db: SqlitePool,
    membership: MembershipService,
    messages: MessageService,
}

impl ChannelService {
    pub fn new(db: SqlitePool, membership: MembershipService, messages: MessageService) -> Self {
        Self {
            db,
            membership,
            messages,
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Channel> {
        let channel = sqlx::query_as::<_, Channel>(
            "SELECT id, activity_id, name, created_at FROM channels WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Channel not found".to_string()))?;

        Ok(channel)
    }

    /// Channel with resolved members and its latest message.
    pub async fn detail(&self, channel_id: Uuid, caller: &AuthUser) -> Result<ChannelDetail> {
        let channel = self.membership.authorize_channel(channel_id, caller).await?;
        let members = self.membership.list_members(channel.activity_id).await?;
        let last_message = self.messages.latest(channel.id).await?;

        Ok(ChannelDetail {
            id: channel.id,
            activity_id: channel.activity_id,
            name: channel.name,
            members,
            last_message: last_message.map(Into::into),
        })
    }

    /// Admins see every channel; users see the channels of their activities.
    pub async fn list_for(&self, caller: &AuthUser) -> Result<Vec<Channel>> {
        let channels = if caller.is_admin() {
            sqlx::query_as::<_, Channel>(
                "SELECT id, activity_id, name, created_at FROM channels ORDER BY created_at, name",
            )
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, Channel>(
                r#"
                SELECT c.id, c.activity_id, c.name, c.created_at
                FROM participations p
                JOIN channels c ON c.activity_id = p.activity_id
                WHERE p.user_id = ?
                ORDER BY c.created_at, c.name
                "#,
            )
            .bind(caller.user_id)
            .fetch_all(&self.db)
            .await?
        };

        Ok(channels)
    }

    /// Rename a channel. A missing or blank name leaves the channel untouched
    /// and still succeeds. The flag reports whether anything changed.
    pub async fn rename(
        &self,
        channel_id: Uuid,
        name: Option<&str>,
        caller: &AuthUser,
    ) -> Result<(Channel, bool)> {
        let channel = self.membership.authorize_channel(channel_id, caller).await?;

        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok((channel, false));
        };

        let channel = sqlx::query_as::<_, Channel>(
            r#"
            UPDATE channels SET name = ?
            WHERE id = ?
            RETURNING id, activity_id, name, created_at
            "#,
        )
        .bind(name)
        .bind(channel_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Channel not found".to_string()))?;

        tracing::info!(%channel_id, name = %channel.name, by = %caller.user_id, "Channel renamed");
        Ok((channel, true))
    }
}
