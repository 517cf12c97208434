use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::models::{ListMessages, Message};
use crate::services::membership::MembershipService;
use sqlx::SqlitePool;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = "seq, id, channel_id, author_id, body, created_at";

/// Append-only chat log. Every read and write is gated by channel membership.
#[derive(Clone)]
pub struct MessageService {
    db: SqlitePool,
    membership: MembershipService,
}

impl MessageService {
    pub fn new(db: SqlitePool, membership: MembershipService) -> Self {
        Self { db, membership }
    }

    pub async fn post(&self, channel_id: Uuid, caller: &AuthUser, body: &str) -> Result<Message> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::EmptyBody);
        }

        self.membership.authorize_channel(channel_id, caller).await?;

        // created_at is stamped by the store under its write lock so it
        // never disagrees with seq order.
        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (id, channel_id, author_id, body, created_at)
            VALUES (?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(channel_id)
        .bind(caller.user_id)
        .bind(body)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            // The channel was deleted between authorization and insert.
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AppError::NotFound("Channel not found".to_string())
            }
            other => other.into(),
        })?;

        tracing::debug!(%channel_id, author = %caller.user_id, message_id = %message.id, "Message posted");
        Ok(message)
    }

    /// A page of messages, oldest first. Without `before` this is the newest
    /// page; with it, the page immediately preceding that message.
    pub async fn list(&self, channel_id: Uuid, caller: &AuthUser, page: ListMessages) -> Result<Vec<Message>> {
        self.membership.authorize_channel(channel_id, caller).await?;

        let limit = page.effective_limit();
        let upper_seq = match page.before {
            Some(before_id) => sqlx::query_scalar::<_, i64>(
                "SELECT seq FROM messages WHERE id = ? AND channel_id = ?",
            )
            .bind(before_id)
            .bind(channel_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?,
            None => i64::MAX,
        };

        let mut messages = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE channel_id = ? AND seq < ?
            ORDER BY seq DESC
            LIMIT ?
            "#
        ))
        .bind(channel_id)
        .bind(upper_seq)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    /// Latest message in the channel; a single seek on `(channel_id, seq)`.
    pub async fn latest(&self, channel_id: Uuid) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE channel_id = ? ORDER BY seq DESC LIMIT 1"
        ))
        .bind(channel_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(message)
    }

    /// Admin-only: delete one message, or every message when `message_id` is `None`.
    /// Returns the number of messages removed.
    pub async fn delete(&self, channel_id: Uuid, caller: &AuthUser, message_id: Option<Uuid>) -> Result<u64> {
        caller.require_admin()?;

        let channel_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM channels WHERE id = ?)")
            .bind(channel_id)
            .fetch_one(&self.db)
            .await?;
        if !channel_exists {
            return Err(AppError::NotFound("Channel not found".to_string()));
        }

        let removed = match message_id {
            Some(message_id) => {
                let removed = sqlx::query("DELETE FROM messages WHERE id = ? AND channel_id = ?")
                    .bind(message_id)
                    .bind(channel_id)
                    .execute(&self.db)
                    .await?
                    .rows_affected();
                if removed == 0 {
                    return Err(AppError::NotFound("Message not found".to_string()));
                }
                removed
            }
            None => sqlx::query("DELETE FROM messages WHERE channel_id = ?")
                .bind(channel_id)
                .execute(&self.db)
                .await?
                .rows_affected(),
        };

        tracing::info!(%channel_id, ?message_id, removed, admin = %caller.user_id, "Messages deleted");
        Ok(removed)
    }
}
