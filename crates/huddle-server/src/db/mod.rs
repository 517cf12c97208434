use crate::error::AppError;
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// Tables that must exist before the server accepts traffic
const REQUIRED_TABLES: &[&str] = &["categories", "activities", "participations", "channels", "messages"];

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;

    tracing::info!(database_url, max_connections, "Database connection pool initialized");
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}

/// Tables from `REQUIRED_TABLES` that are absent from the schema.
pub async fn missing_tables(pool: &SqlitePool) -> std::result::Result<Vec<&'static str>, sqlx::Error> {
    let existing: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;

    Ok(REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|table| !existing.iter().any(|name| name == table))
        .collect())
}

/// Startup readiness gate: refuse to serve against a partially migrated store.
pub async fn ensure_schema_ready(pool: &SqlitePool) -> std::result::Result<(), AppError> {
    let missing = missing_tables(pool).await?;
    if !missing.is_empty() {
        return Err(AppError::Unavailable(format!(
            "missing tables: {}",
            missing.join(", ")
        )));
    }
    tracing::info!("Schema readiness check passed");
    Ok(())
}
