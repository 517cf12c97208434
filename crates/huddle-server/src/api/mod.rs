mod activities;
mod channels;
mod messages;

use crate::db;
use crate::error::AppError;
use crate::state::AppState;
use crate::ws;
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health checks
        .route("/health", get(|| async { "OK" }))
        .route("/ready", get(ready))
        // Activity routes
        .route("/api/categories", get(activities::list_categories))
        .route(
            "/api/activities",
            post(activities::create_activity)
                .get(activities::list_activities)
                .delete(activities::delete_all_activities),
        )
        .route("/api/activities/discover", get(activities::discover_activities))
        .route("/api/activities/stats", get(activities::get_stats))
        .route(
            "/api/activities/{id}",
            get(activities::get_activity).delete(activities::delete_activity),
        )
        .route("/api/activities/{id}/join", post(activities::join_activity))
        .route("/api/activities/{id}/withdraw", post(activities::withdraw_activity))
        .route("/api/activities/{id}/members", get(activities::list_members))
        .route("/api/me/memberships", get(activities::list_my_memberships))
        // Channel routes
        .route("/api/channels", get(channels::list_channels))
        .route(
            "/api/channels/{id}",
            get(channels::get_channel).patch(channels::update_channel),
        )
        .route(
            "/api/channels/{id}/messages",
            get(messages::list_messages)
                .post(messages::create_message)
                .delete(messages::delete_all_messages),
        )
        .route(
            "/api/channels/{id}/messages/{message_id}",
            axum::routing::delete(messages::delete_message),
        )
        // WebSocket endpoint
        .route("/ws", get(ws::handler::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn ready(State(state): State<AppState>) -> Result<&'static str, AppError> {
    let missing = db::missing_tables(&state.db).await?;
    if missing.is_empty() {
        Ok("READY")
    } else {
        Err(AppError::Unavailable(format!("missing tables: {}", missing.join(", "))))
    }
}
