use crate::auth::AuthUser;
use crate::error::Result;
use crate::models::{CreateMessage, ListMessages};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use huddle_protocol::{MessageData, ServerMessage};
use uuid::Uuid;

pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<Uuid>,
    Query(query): Query<ListMessages>,
) -> Result<Json<Vec<MessageData>>> {
    let messages = state.message_service.list(channel_id, &auth, query).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

pub async fn create_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<Uuid>,
    Json(input): Json<CreateMessage>,
) -> Result<(StatusCode, Json<MessageData>)> {
    let message: MessageData = state
        .message_service
        .post(channel_id, &auth, &input.body)
        .await?
        .into();

    // Membership is checked again at push time.
    match state.membership.channel_members(channel_id).await {
        Ok(members) => {
            state
                .connections
                .broadcast_to_members(
                    channel_id,
                    &members,
                    &ServerMessage::MessageCreated {
                        message: message.clone(),
                    },
                )
                .await;
        }
        Err(e) => {
            tracing::error!(%channel_id, "Skipping push, member lookup failed: {}", e);
        }
    }

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn delete_all_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.message_service.delete(channel_id, &auth, None).await?;

    state
        .connections
        .broadcast_to_channel(
            channel_id,
            &ServerMessage::MessagesDeleted {
                channel_id,
                message_id: None,
            },
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((channel_id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    state
        .message_service
        .delete(channel_id, &auth, Some(message_id))
        .await?;

    state
        .connections
        .broadcast_to_channel(
            channel_id,
            &ServerMessage::MessagesDeleted {
                channel_id,
                message_id: Some(message_id),
            },
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
