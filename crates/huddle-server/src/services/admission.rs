//! Admission control: creating activities and admitting participants
//! without ever exceeding capacity.
//!
//! A join claims a slot with a single conditional increment on the
//! activity's own row (`member_count < capacity`) and inserts the
//! participation in the same transaction. The row write is the only point
//! of contention, so joins on one activity are linearized while joins on
//! different activities never touch the same row. The primary key on
//! `participations (activity_id, user_id)` makes duplicate joins fail in
//! the store rather than in application code.

use crate::auth::AuthUser;
use crate::error::{AppError, FieldErrors, Result};
use crate::models::{default_channel_name, Activity, Channel, CreateActivity, DeletedActivity, Participation};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct AdmissionService {
    db: SqlitePool,
    retry_backoff: Duration,
}

impl AdmissionService {
    pub fn new(db: SqlitePool, retry_backoff: Duration) -> Self {
        Self { db, retry_backoff }
    }

    /// Create an activity together with its channel and the creator's participation.
    pub async fn create_activity(
        &self,
        creator: &AuthUser,
        input: CreateActivity,
    ) -> Result<(Activity, Channel)> {
        let input = self.validate(input).await?;

        let now = Utc::now();
        let activity = Activity {
            id: Uuid::new_v4(),
            title: input.title,
            category: input.category,
            location: input.location,
            description: input.description,
            scheduled_at: input.scheduled_at,
            capacity: input.capacity,
            member_count: 1,
            created_at: now,
            channel_id: Uuid::new_v4(),
        };
        let channel = Channel {
            id: activity.channel_id,
            activity_id: activity.id,
            name: default_channel_name(&activity.title),
            created_at: now,
        };

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO activities (id, title, category, location, description, scheduled_at,
                                    capacity, member_count, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(activity.id)
        .bind(&activity.title)
        .bind(&activity.category)
        .bind(&activity.location)
        .bind(&activity.description)
        .bind(activity.scheduled_at)
        .bind(activity.capacity)
        .bind(activity.member_count)
        .bind(activity.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO channels (id, activity_id, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(channel.id)
            .bind(channel.activity_id)
            .bind(&channel.name)
            .bind(channel.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict("Activity already has a channel".to_string())
                }
                other => other.into(),
            })?;

        sqlx::query(
            "INSERT INTO participations (activity_id, user_id, note, joined_at) VALUES (?, ?, NULL, ?)",
        )
        .bind(activity.id)
        .bind(creator.user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            activity_id = %activity.id,
            channel_id = %channel.id,
            creator = %creator.user_id,
            capacity = activity.capacity,
            "Activity created"
        );

        Ok((activity, channel))
    }

    /// Field-level validation; a lone capacity failure is reported as `InvalidCapacity`.
    async fn validate(&self, mut input: CreateActivity) -> Result<CreateActivity> {
        let mut errors = FieldErrors::new();

        input.title = input.title.trim().to_string();
        input.location = input.location.trim().to_string();
        input.category = input.category.trim().to_lowercase();

        if input.title.is_empty() {
            errors
                .entry("title".to_string())
                .or_default()
                .push("Title is required".to_string());
        }
        if input.location.is_empty() {
            errors
                .entry("location".to_string())
                .or_default()
                .push("Location is required".to_string());
        }

        let category_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE slug = ?)")
                .bind(&input.category)
                .fetch_one(&self.db)
                .await?;
        if !category_exists {
            errors
                .entry("category".to_string())
                .or_default()
                .push(format!("Unknown category '{}'", input.category));
        }

        let bad_capacity = input.capacity <= 0;
        if bad_capacity {
            errors
                .entry("capacity".to_string())
                .or_default()
                .push(AppError::InvalidCapacity.to_string());
        }

        match errors.len() {
            0 => Ok(input),
            1 if bad_capacity => Err(AppError::InvalidCapacity),
            _ => Err(AppError::Validation(errors)),
        }
    }

    /// Admit `user_id` to the activity. Transient store failures are retried once.
    pub async fn join(
        &self,
        activity_id: Uuid,
        user_id: Uuid,
        note: Option<String>,
    ) -> Result<Participation> {
        match self.try_join(activity_id, user_id, note.clone()).await {
            Err(e) if e.is_transient() => {
                tracing::warn!(%activity_id, %user_id, error = %e, "Join hit a transient store error, retrying");
                tokio::time::sleep(self.retry_backoff).await;
                self.try_join(activity_id, user_id, note).await
            }
            result => result,
        }
    }

    async fn try_join(
        &self,
        activity_id: Uuid,
        user_id: Uuid,
        note: Option<String>,
    ) -> Result<Participation> {
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let mut tx = self.db.begin().await?;

        let claimed = sqlx::query(
            r#"
            UPDATE activities
            SET member_count = member_count + 1
            WHERE id = ? AND member_count < capacity
            "#,
        )
        .bind(activity_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            let reason = rejection_reason(&mut *tx, activity_id, user_id).await?;
            tx.rollback().await?;
            tracing::debug!(%activity_id, %user_id, code = reason.code(), "Join rejected");
            return Err(reason);
        }

        let inserted = sqlx::query_as::<_, Participation>(
            r#"
            INSERT INTO participations (activity_id, user_id, note, joined_at)
            VALUES (?, ?, ?, ?)
            RETURNING activity_id, user_id, note, joined_at
            "#,
        )
        .bind(activity_id)
        .bind(user_id)
        .bind(note)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        let participation = match inserted {
            Ok(participation) => participation,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                // Rolls back the slot claimed above as well.
                tx.rollback().await?;
                return Err(AppError::AlreadyJoined);
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        tracing::info!(%activity_id, %user_id, "Participant joined");
        Ok(participation)
    }

    /// Remove the caller's participation and release its slot. Returns the
    /// activity's channel id so push access can be revoked with it.
    pub async fn withdraw(&self, activity_id: Uuid, user_id: Uuid) -> Result<Uuid> {
        let mut tx = self.db.begin().await?;

        let removed = sqlx::query("DELETE FROM participations WHERE activity_id = ? AND user_id = ?")
            .bind(activity_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(AppError::NotFound("Participation not found".to_string()));
        }

        sqlx::query("UPDATE activities SET member_count = member_count - 1 WHERE id = ?")
            .bind(activity_id)
            .execute(&mut *tx)
            .await?;

        let channel_id: Uuid = sqlx::query_scalar("SELECT id FROM channels WHERE activity_id = ?")
            .bind(activity_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%activity_id, %user_id, %channel_id, "Participant withdrew");
        Ok(channel_id)
    }

    /// Admin-only: delete an activity with its participations, channel and messages.
    /// Opens with a write so the transaction holds the write lock from its
    /// first statement; a read-first transaction cannot wait out a busy lock.
    pub async fn delete_activity(&self, activity_id: Uuid, caller: &AuthUser) -> Result<DeletedActivity> {
        caller.require_admin()?;

        let mut tx = self.db.begin().await?;

        let messages = sqlx::query(
            "DELETE FROM messages WHERE channel_id IN (SELECT id FROM channels WHERE activity_id = ?)",
        )
        .bind(activity_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let channel_id: Uuid =
            sqlx::query_scalar("DELETE FROM channels WHERE activity_id = ? RETURNING id")
                .bind(activity_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

        let participations = sqlx::query("DELETE FROM participations WHERE activity_id = ?")
            .bind(activity_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM activities WHERE id = ?")
            .bind(activity_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            %activity_id,
            %channel_id,
            admin = %caller.user_id,
            messages,
            participations,
            "Activity deleted"
        );

        Ok(DeletedActivity {
            activity_id,
            channel_id,
        })
    }

    /// Admin-only bulk form of [`delete_activity`](Self::delete_activity).
    pub async fn delete_all_activities(&self, caller: &AuthUser) -> Result<Vec<DeletedActivity>> {
        caller.require_admin()?;

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM messages").execute(&mut *tx).await?;
        let deleted: Vec<(Uuid, Uuid)> =
            sqlx::query_as("DELETE FROM channels RETURNING activity_id, id")
                .fetch_all(&mut *tx)
                .await?;
        sqlx::query("DELETE FROM participations").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM activities").execute(&mut *tx).await?;

        tx.commit().await?;

        tracing::warn!(admin = %caller.user_id, count = deleted.len(), "All activities deleted");

        Ok(deleted
            .into_iter()
            .map(|(activity_id, channel_id)| DeletedActivity {
                activity_id,
                channel_id,
            })
            .collect())
    }
}

/// Classify a failed slot claim. An existing participation wins over
/// "full" so a retried join that already committed reports `AlreadyJoined`.
async fn rejection_reason(conn: &mut SqliteConnection, activity_id: Uuid, user_id: Uuid) -> Result<AppError> {
    let already_joined: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM participations WHERE activity_id = ? AND user_id = ?)",
    )
    .bind(activity_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    if already_joined {
        return Ok(AppError::AlreadyJoined);
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM activities WHERE id = ?)")
        .bind(activity_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(if exists {
        AppError::ActivityFull
    } else {
        AppError::NotFound("Activity not found".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use crate::services::test_support::new_activity;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::pool::PoolConnection;
    use sqlx::Sqlite;
    use std::collections::HashSet;
    use std::str::FromStr;
    use std::time::Instant;
    use tempfile::TempDir;

    fn service(pool: &SqlitePool) -> AdmissionService {
        AdmissionService::new(pool.clone(), Duration::from_millis(10))
    }

    async fn participation_count(pool: &SqlitePool, activity_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM participations WHERE activity_id = ?")
            .bind(activity_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn member_count(pool: &SqlitePool, activity_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT member_count FROM activities WHERE id = ?")
            .bind(activity_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    /// A second pool on the same file that gives up on a held write lock after 20ms.
    async fn impatient_pool(dir: &TempDir) -> SqlitePool {
        let url = format!("sqlite://{}", dir.path().join("huddle.db").display());
        let options = SqliteConnectOptions::from_str(&url)
            .unwrap()
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(20));
        SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .unwrap()
    }

    /// Take the database write lock and hold it until the connection commits.
    async fn hold_write_lock(pool: &SqlitePool) -> PoolConnection<Sqlite> {
        let mut conn = pool.acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await.unwrap();
        conn
    }

    #[tokio::test]
    async fn create_enrolls_creator_and_creates_channel() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());

        let (activity, channel) = admission.create_activity(&creator, new_activity(4)).await.unwrap();

        assert_eq!(activity.member_count, 1);
        assert_eq!(activity.available_slots(), 3);
        assert_eq!(channel.activity_id, activity.id);
        assert_eq!(channel.name, "Group Evening futsal");
        assert_eq!(participation_count(&pool, activity.id).await, 1);
    }

    #[tokio::test]
    async fn non_positive_capacity_is_rejected() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());

        for capacity in [0, -3] {
            let err = admission
                .create_activity(&creator, new_activity(capacity))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidCapacity));
        }

        let activities: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activities")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(activities, 0);
    }

    #[tokio::test]
    async fn validation_errors_are_keyed_by_field() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());

        let mut input = new_activity(0);
        input.title = "   ".to_string();
        input.category = "curling".to_string();

        match admission.create_activity(&creator, input).await {
            Err(AppError::Validation(fields)) => {
                assert!(fields.contains_key("title"));
                assert!(fields.contains_key("category"));
                assert!(fields.contains_key("capacity"));
                assert!(!fields.contains_key("location"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|(a, _)| a.id)),
        }
    }

    #[tokio::test]
    async fn second_join_reports_already_joined() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());
        let (activity, _) = admission.create_activity(&creator, new_activity(5)).await.unwrap();
        let user = Uuid::new_v4();

        let participation = admission
            .join(activity.id, user, Some("  bringing a ball ".to_string()))
            .await
            .unwrap();
        assert_eq!(participation.note.as_deref(), Some("bringing a ball"));

        let err = admission.join(activity.id, user, None).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyJoined));
        assert_eq!(participation_count(&pool, activity.id).await, 2);
        assert_eq!(member_count(&pool, activity.id).await, 2);

        // The creator was auto-enrolled.
        let err = admission.join(activity.id, creator.user_id, None).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyJoined));
    }

    #[tokio::test]
    async fn retry_after_filling_join_reports_already_joined() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());
        let (activity, _) = admission.create_activity(&creator, new_activity(2)).await.unwrap();
        let user = Uuid::new_v4();

        admission.join(activity.id, user, None).await.unwrap();
        let err = admission.join(activity.id, user, None).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyJoined));

        let err = admission.join(activity.id, Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, AppError::ActivityFull));
    }

    #[tokio::test]
    async fn join_unknown_activity_is_not_found() {
        let (pool, _dir) = test_pool().await;
        let err = service(&pool)
            .join(Uuid::new_v4(), Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_joins_never_exceed_capacity() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());
        let capacity = 5;
        let (activity, _) = admission
            .create_activity(&creator, new_activity(capacity))
            .await
            .unwrap();

        // Some users race twice to exercise the uniqueness path too.
        let users: Vec<Uuid> = (0..12).map(|_| Uuid::new_v4()).collect();
        let mut handles = Vec::new();
        for user in users.iter().chain(users.iter().take(4)) {
            let admission = admission.clone();
            let user = *user;
            handles.push(tokio::spawn(async move {
                (user, admission.join(activity.id, user, None).await)
            }));
        }

        let mut admitted = HashSet::new();
        for handle in handles {
            match handle.await.unwrap() {
                (user, Ok(_)) => assert!(admitted.insert(user), "user admitted twice"),
                (_, Err(AppError::ActivityFull)) | (_, Err(AppError::AlreadyJoined)) => {}
                (_, Err(other)) => panic!("unexpected join error: {other}"),
            }
        }

        // The creator already holds one slot.
        assert_eq!(admitted.len() as i64, capacity - 1);
        assert_eq!(participation_count(&pool, activity.id).await, capacity);
        assert_eq!(member_count(&pool, activity.id).await, capacity);
    }

    #[tokio::test]
    async fn joins_on_different_activities_are_independent() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());
        let (first, _) = admission.create_activity(&creator, new_activity(2)).await.unwrap();
        let (second, _) = admission.create_activity(&creator, new_activity(2)).await.unwrap();

        let user = Uuid::new_v4();
        admission.join(first.id, user, None).await.unwrap();
        admission.join(second.id, user, None).await.unwrap();

        assert!(matches!(
            admission.join(first.id, Uuid::new_v4(), None).await,
            Err(AppError::ActivityFull)
        ));
        assert_eq!(participation_count(&pool, second.id).await, 2);
    }

    #[tokio::test]
    async fn withdraw_frees_a_slot() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());
        let (activity, channel) = admission.create_activity(&creator, new_activity(2)).await.unwrap();
        let bob = Uuid::new_v4();
        let carol = Uuid::new_v4();

        admission.join(activity.id, bob, None).await.unwrap();
        assert!(matches!(
            admission.join(activity.id, carol, None).await,
            Err(AppError::ActivityFull)
        ));

        assert_eq!(admission.withdraw(activity.id, bob).await.unwrap(), channel.id);
        assert_eq!(member_count(&pool, activity.id).await, 1);
        admission.join(activity.id, carol, None).await.unwrap();

        let err = admission.withdraw(activity.id, bob).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(member_count(&pool, activity.id).await, 2);
    }

    #[tokio::test]
    async fn delete_requires_admin_and_cascades() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());
        let admin = AuthUser::admin(Uuid::new_v4());
        let (activity, channel) = admission.create_activity(&creator, new_activity(3)).await.unwrap();

        sqlx::query(
            "INSERT INTO messages (id, channel_id, author_id, body, created_at) VALUES (?, ?, ?, 'hi', ?)",
        )
        .bind(Uuid::new_v4())
        .bind(channel.id)
        .bind(creator.user_id)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        assert!(matches!(
            admission.delete_activity(activity.id, &creator).await,
            Err(AppError::Forbidden)
        ));

        let deleted = admission.delete_activity(activity.id, &admin).await.unwrap();
        assert_eq!(deleted.channel_id, channel.id);

        for table in ["activities", "channels", "participations", "messages"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count, 0, "{table} not emptied");
        }

        assert!(matches!(
            admission.delete_activity(activity.id, &admin).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            admission.join(activity.id, Uuid::new_v4(), None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn bulk_delete_is_admin_only() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());
        admission.create_activity(&creator, new_activity(3)).await.unwrap();
        admission.create_activity(&creator, new_activity(3)).await.unwrap();

        assert!(matches!(
            admission.delete_all_activities(&creator).await,
            Err(AppError::Forbidden)
        ));

        let deleted = admission
            .delete_all_activities(&AuthUser::admin(Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(deleted.len(), 2);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn busy_join_succeeds_on_retry() {
        let (pool, dir) = test_pool().await;
        let creator = AuthUser::user(Uuid::new_v4());
        let (activity, _) = service(&pool).create_activity(&creator, new_activity(3)).await.unwrap();

        let backoff = Duration::from_millis(250);
        let admission = AdmissionService::new(impatient_pool(&dir).await, backoff);
        let mut blocker = hold_write_lock(&pool).await;

        let user = Uuid::new_v4();
        let started = Instant::now();
        let join = tokio::spawn(async move { admission.join(activity.id, user, None).await });

        // Release while the join is backing off after its first, busy attempt.
        tokio::time::sleep(Duration::from_millis(100)).await;
        sqlx::query("COMMIT").execute(&mut *blocker).await.unwrap();

        let participation = join.await.unwrap().unwrap();
        assert_eq!(participation.user_id, user);
        assert!(started.elapsed() >= backoff, "join did not wait for the retry");
        assert_eq!(member_count(&pool, activity.id).await, 2);
    }

    #[tokio::test]
    async fn busy_join_is_retried_only_once() {
        let (pool, dir) = test_pool().await;
        let creator = AuthUser::user(Uuid::new_v4());
        let (activity, _) = service(&pool).create_activity(&creator, new_activity(3)).await.unwrap();

        let backoff = Duration::from_millis(250);
        let admission = AdmissionService::new(impatient_pool(&dir).await, backoff);
        let mut blocker = hold_write_lock(&pool).await;

        let started = Instant::now();
        let err = admission.join(activity.id, Uuid::new_v4(), None).await.unwrap_err();
        let elapsed = started.elapsed();
        sqlx::query("COMMIT").execute(&mut *blocker).await.unwrap();

        assert!(err.is_transient(), "expected a busy error, got {err}");
        assert!(elapsed >= backoff);
        assert!(elapsed < backoff * 2, "join retried more than once ({elapsed:?})");
        assert_eq!(member_count(&pool, activity.id).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn delete_succeeds_while_other_activity_fills() {
        let (pool, _dir) = test_pool().await;
        let admission = service(&pool);
        let creator = AuthUser::user(Uuid::new_v4());
        let admin = AuthUser::admin(Uuid::new_v4());

        for _ in 0..10 {
            let (doomed, _) = admission.create_activity(&creator, new_activity(5)).await.unwrap();
            let (busy, _) = admission.create_activity(&creator, new_activity(50)).await.unwrap();

            let joins: Vec<_> = (0..20)
                .map(|_| {
                    let admission = admission.clone();
                    tokio::spawn(async move { admission.join(busy.id, Uuid::new_v4(), None).await })
                })
                .collect();

            let deleted = admission.delete_activity(doomed.id, &admin).await;
            assert!(deleted.is_ok(), "delete failed under load: {:?}", deleted.err());

            for join in joins {
                join.await.unwrap().unwrap();
            }
            assert_eq!(member_count(&pool, busy.id).await, 21);
        }

        let all = admission.delete_all_activities(&admin).await.unwrap();
        assert_eq!(all.len(), 10);
    }
}
