//! Huddle server library
//!
//! Exposes the server components for the binary and for integration tests.

pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod ws;

use anyhow::Result;

/// Open the store, migrate it, check it is ready and build the router.
pub async fn create_app(config: state::Config) -> Result<(axum::Router, sqlx::SqlitePool)> {
    let db_pool = db::init_pool(&config.database_url, config.max_connections).await?;
    db::run_migrations(&db_pool).await?;
    db::ensure_schema_ready(&db_pool).await?;
    let app_state = state::AppState::new(config, db_pool.clone());
    let router = api::create_router(app_state);
    Ok((router, db_pool))
}
