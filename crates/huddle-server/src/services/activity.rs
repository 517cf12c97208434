use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityFilter, Category, ACTIVITY_COLUMNS};
use crate::services::membership::MembershipService;
use chrono::{Duration, NaiveTime, Utc};
use huddle_protocol::{ActivityAdminView, ActivityStats, ActivityView, CategoryCount};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct ActivityService {
    db: SqlitePool,
    membership: MembershipService,
}

impl ActivityService {
    pub fn new(db: SqlitePool, membership: MembershipService) -> Self {
        Self { db, membership }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Activity> {
        let activity = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities a JOIN channels c ON c.activity_id = a.id WHERE a.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

        Ok(activity)
    }

    /// Pick the response variant for the caller's role.
    pub async fn view_for(&self, caller: &AuthUser, activity: &Activity) -> Result<ActivityView> {
        if caller.is_admin() {
            let members = self.membership.list_members(activity.id).await?;
            Ok(ActivityView::Admin(ActivityAdminView {
                summary: activity.summary(),
                members,
                created_at: activity.created_at,
            }))
        } else {
            Ok(ActivityView::Summary(activity.summary()))
        }
    }

    /// Admins see every activity; users see the ones they participate in.
    pub async fn list_for(&self, caller: &AuthUser) -> Result<Vec<ActivityView>> {
        let activities = if caller.is_admin() {
            sqlx::query_as::<_, Activity>(&format!(
                r#"
                SELECT {ACTIVITY_COLUMNS}
                FROM activities a JOIN channels c ON c.activity_id = a.id
                ORDER BY a.scheduled_at, a.created_at
                "#
            ))
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, Activity>(&format!(
                r#"
                SELECT {ACTIVITY_COLUMNS}
                FROM participations p
                JOIN activities a ON a.id = p.activity_id
                JOIN channels c ON c.activity_id = a.id
                WHERE p.user_id = ?
                ORDER BY a.scheduled_at, a.created_at
                "#
            ))
            .bind(caller.user_id)
            .fetch_all(&self.db)
            .await?
        };

        let mut views = Vec::with_capacity(activities.len());
        for activity in &activities {
            views.push(self.view_for(caller, activity).await?);
        }
        Ok(views)
    }

    /// Dashboard search over all activities, soonest first.
    pub async fn discover(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities a JOIN channels c ON c.activity_id = a.id WHERE 1 = 1"
        ));

        if let Some(category) = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            query.push(" AND a.category = ").push_bind(category.to_lowercase());
        }

        if let Some(keyword) = filter.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            let pattern = format!("%{}%", escape_like(keyword));
            query
                .push(" AND (a.title LIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\' OR a.description LIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\' OR a.location LIKE ")
                .push_bind(pattern)
                .push(r" ESCAPE '\')");
        }

        if let Some(when) = filter.when {
            let start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
            let end = start + Duration::days(when.days());
            query
                .push(" AND a.scheduled_at >= ")
                .push_bind(start)
                .push(" AND a.scheduled_at < ")
                .push_bind(end);
        }

        if filter.available_only {
            query.push(" AND a.member_count < a.capacity");
        }

        query.push(" ORDER BY a.scheduled_at, a.created_at");

        let activities = query.build_query_as::<Activity>().fetch_all(&self.db).await?;
        Ok(activities)
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            // "Other" always sorts last
            "SELECT slug, name FROM categories ORDER BY slug = 'other', name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }

    pub async fn stats(&self) -> Result<ActivityStats> {
        let start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);

        let total_activities: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activities")
            .fetch_one(&self.db)
            .await?;
        let activities_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM activities WHERE scheduled_at >= ? AND scheduled_at < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;
        let total_players: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM participations")
                .fetch_one(&self.db)
                .await?;
        let category_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.db)
            .await?;

        let popular: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT cat.slug, cat.name, COUNT(a.id) AS activity_count
            FROM categories cat
            LEFT JOIN activities a ON a.category = cat.slug
            GROUP BY cat.slug, cat.name
            ORDER BY activity_count DESC, cat.name
            LIMIT 3
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(ActivityStats {
            total_activities,
            activities_today,
            total_players,
            category_count,
            popular_categories: popular
                .into_iter()
                .map(|(slug, name, activity_count)| CategoryCount {
                    slug,
                    name,
                    activity_count,
                })
                .collect(),
        })
    }
}

/// Make `%`, `_` and the escape character itself match literally in a
/// `LIKE ... ESCAPE '\'` pattern.
fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use crate::models::When;
    use crate::services::admission::AdmissionService;
    use crate::services::test_support::new_activity;

    fn services(pool: &SqlitePool) -> (AdmissionService, ActivityService) {
        (
            AdmissionService::new(pool.clone(), std::time::Duration::from_millis(10)),
            ActivityService::new(pool.clone(), MembershipService::new(pool.clone())),
        )
    }

    #[tokio::test]
    async fn view_variant_follows_role() {
        let (pool, _dir) = test_pool().await;
        let (admission, activities) = services(&pool);
        let creator = AuthUser::user(Uuid::new_v4());
        let (activity, _) = admission.create_activity(&creator, new_activity(3)).await.unwrap();

        let activity = activities.get_by_id(activity.id).await.unwrap();
        match activities.view_for(&creator, &activity).await.unwrap() {
            ActivityView::Summary(summary) => assert_eq!(summary.available_slots, 2),
            other => panic!("user got {other:?}"),
        }
        match activities.view_for(&AuthUser::admin(Uuid::new_v4()), &activity).await.unwrap() {
            ActivityView::Admin(view) => assert_eq!(view.members, vec![creator.user_id]),
            other => panic!("admin got {other:?}"),
        }
    }

    #[tokio::test]
    async fn listing_is_scoped_for_users() {
        let (pool, _dir) = test_pool().await;
        let (admission, activities) = services(&pool);
        let alice = AuthUser::user(Uuid::new_v4());
        let bob = AuthUser::user(Uuid::new_v4());
        let (mine, _) = admission.create_activity(&alice, new_activity(3)).await.unwrap();
        admission.create_activity(&bob, new_activity(3)).await.unwrap();

        let own = activities.list_for(&alice).await.unwrap();
        assert_eq!(own.len(), 1);
        match &own[0] {
            ActivityView::Summary(summary) => assert_eq!(summary.id, mine.id),
            other => panic!("user got {other:?}"),
        }

        let all = activities.list_for(&AuthUser::admin(Uuid::new_v4())).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|v| matches!(v, ActivityView::Admin(_))));
    }

    #[tokio::test]
    async fn discover_applies_filters() {
        let (pool, _dir) = test_pool().await;
        let (admission, activities) = services(&pool);
        let creator = AuthUser::user(Uuid::new_v4());

        let mut run = new_activity(5);
        run.title = "Morning run".to_string();
        run.category = "running".to_string();
        run.scheduled_at = Utc::now() + Duration::days(20);
        let (run, _) = admission.create_activity(&creator, run).await.unwrap();

        let mut full = new_activity(1);
        full.location = "Riverside park".to_string();
        let (full, _) = admission.create_activity(&creator, full).await.unwrap();

        let by_category = activities
            .discover(&ActivityFilter {
                category: Some("RUNNING".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_category.iter().map(|a| a.id).collect::<Vec<_>>(), vec![run.id]);

        let by_keyword = activities
            .discover(&ActivityFilter {
                keyword: Some("riverside".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_keyword.iter().map(|a| a.id).collect::<Vec<_>>(), vec![full.id]);

        let available = activities
            .discover(&ActivityFilter {
                available_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(available.iter().map(|a| a.id).collect::<Vec<_>>(), vec![run.id]);

        let this_week = activities
            .discover(&ActivityFilter {
                when: Some(When::Week),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(this_week.iter().map(|a| a.id).collect::<Vec<_>>(), vec![full.id]);

        let everything = activities.discover(&ActivityFilter::default()).await.unwrap();
        assert_eq!(everything.len(), 2);
        assert_eq!(everything[0].id, full.id, "soonest first");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%"), r"100\%");
        assert_eq!(escape_like("snake_case"), r"snake\_case");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("futsal"), "futsal");
    }

    #[tokio::test]
    async fn keyword_wildcards_match_literally() {
        let (pool, _dir) = test_pool().await;
        let (admission, activities) = services(&pool);
        let creator = AuthUser::user(Uuid::new_v4());

        let mut effort = new_activity(4);
        effort.title = "100% effort drills".to_string();
        let (effort, _) = admission.create_activity(&creator, effort).await.unwrap();
        admission.create_activity(&creator, new_activity(4)).await.unwrap();

        let search = |keyword: &str| ActivityFilter {
            keyword: Some(keyword.to_string()),
            ..Default::default()
        };

        let found = activities.discover(&search("100%")).await.unwrap();
        assert_eq!(found.iter().map(|a| a.id).collect::<Vec<_>>(), vec![effort.id]);

        let percent = activities.discover(&search("%")).await.unwrap();
        assert_eq!(percent.iter().map(|a| a.id).collect::<Vec<_>>(), vec![effort.id]);

        assert!(activities.discover(&search("_")).await.unwrap().is_empty());
        assert!(activities.discover(&search("fut%al")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_count_players_once() {
        let (pool, _dir) = test_pool().await;
        let (admission, activities) = services(&pool);
        let creator = AuthUser::user(Uuid::new_v4());
        let (first, _) = admission.create_activity(&creator, new_activity(3)).await.unwrap();
        admission.create_activity(&creator, new_activity(3)).await.unwrap();
        admission.join(first.id, Uuid::new_v4(), None).await.unwrap();

        let stats = activities.stats().await.unwrap();
        assert_eq!(stats.total_activities, 2);
        assert_eq!(stats.total_players, 2);
        assert_eq!(stats.category_count, 7);
        assert_eq!(stats.popular_categories[0].slug, "futsal");
        assert_eq!(stats.popular_categories[0].activity_count, 2);
    }

    #[tokio::test]
    async fn other_category_sorts_last() {
        let (pool, _dir) = test_pool().await;
        let (_, activities) = services(&pool);
        let categories = activities.categories().await.unwrap();
        assert_eq!(categories.len(), 7);
        assert_eq!(categories.last().map(|c| c.slug.as_str()), Some("other"));
    }
}
