use crate::auth::AuthUser;
use crate::error::Result;
use crate::models::{ActivityFilter, CreateActivity, DeletedActivity, JoinActivity};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use huddle_protocol::{
    ActivityStats, ActivitySummary, ActivityView, CategoryData, CreateActivityResponse,
    JoinResponse, ServerMessage,
};
use uuid::Uuid;

pub async fn list_categories(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<CategoryData>>> {
    let categories = state.activity_service.categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

pub async fn create_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateActivity>,
) -> Result<(StatusCode, Json<CreateActivityResponse>)> {
    let (activity, channel) = state.admission.create_activity(&auth, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateActivityResponse {
            success: true,
            activity: activity.summary(),
            channel_id: channel.id,
        }),
    ))
}

pub async fn list_activities(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ActivityView>>> {
    let views = state.activity_service.list_for(&auth).await?;
    Ok(Json(views))
}

pub async fn discover_activities(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<ActivityFilter>,
) -> Result<Json<Vec<ActivitySummary>>> {
    let activities = state.activity_service.discover(&filter).await?;
    Ok(Json(activities.iter().map(|a| a.summary()).collect()))
}

pub async fn get_stats(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<ActivityStats>> {
    let stats = state.activity_service.stats().await?;
    Ok(Json(stats))
}

pub async fn get_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ActivityView>> {
    let activity = state.activity_service.get_by_id(id).await?;
    let view = state.activity_service.view_for(&auth, &activity).await?;
    Ok(Json(view))
}

/// Tell subscribers the channel is gone, then forget it.
async fn announce_deleted(state: &AppState, deleted: DeletedActivity) {
    state
        .connections
        .broadcast_to_channel(
            deleted.channel_id,
            &ServerMessage::ChannelDeleted {
                channel_id: deleted.channel_id,
                activity_id: deleted.activity_id,
            },
        )
        .await;
    state.connections.close_channel(deleted.channel_id).await;
}

pub async fn delete_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let deleted = state.admission.delete_activity(id, &auth).await?;
    announce_deleted(&state, deleted).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_all_activities(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode> {
    let deleted = state.admission.delete_all_activities(&auth).await?;
    for entry in deleted {
        announce_deleted(&state, entry).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    input: Option<Json<JoinActivity>>,
) -> Result<Json<JoinResponse>> {
    let note = input.and_then(|Json(input)| input.note);
    let participation = state.admission.join(id, auth.user_id, note).await?;
    let activity = state.activity_service.get_by_id(id).await?;

    state
        .connections
        .broadcast_to_channel(
            activity.channel_id,
            &ServerMessage::MemberJoined {
                channel_id: activity.channel_id,
                activity_id: activity.id,
                user_id: auth.user_id,
            },
        )
        .await;

    Ok(Json(JoinResponse {
        success: true,
        participation: participation.into(),
        activity: activity.summary(),
    }))
}

pub async fn withdraw_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let channel_id = state.admission.withdraw(id, auth.user_id).await?;

    // The channel still exists; only this user's push access goes away.
    state
        .connections
        .unsubscribe_user_from_channel(auth.user_id, channel_id)
        .await;
    state
        .connections
        .broadcast_to_channel(
            channel_id,
            &ServerMessage::MemberLeft {
                channel_id,
                activity_id: id,
                user_id: auth.user_id,
            },
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Uuid>>> {
    state.membership.authorize_activity(id, &auth).await?;
    let members = state.membership.list_members(id).await?;
    Ok(Json(members))
}

pub async fn list_my_memberships(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Uuid>>> {
    let activities = state.membership.list_memberships(auth.user_id).await?;
    Ok(Json(activities))
}
