use crate::auth::AuthUser;
use crate::error::Result;
use crate::models::UpdateChannel;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use huddle_protocol::{ChannelData, ChannelDetail, ServerMessage};
use uuid::Uuid;

pub async fn list_channels(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ChannelData>>> {
    let channels = state.channel_service.list_for(&auth).await?;
    Ok(Json(channels.into_iter().map(Into::into).collect()))
}

pub async fn get_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ChannelDetail>> {
    let detail = state.channel_service.detail(id, &auth).await?;
    Ok(Json(detail))
}

pub async fn update_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateChannel>,
) -> Result<Json<ChannelData>> {
    let (channel, renamed) = state
        .channel_service
        .rename(id, input.name.as_deref(), &auth)
        .await?;

    if renamed {
        state
            .connections
            .broadcast_to_channel(
                channel.id,
                &ServerMessage::ChannelRenamed {
                    channel_id: channel.id,
                    name: channel.name.clone(),
                },
            )
            .await;
    }

    Ok(Json(channel.into()))
}
