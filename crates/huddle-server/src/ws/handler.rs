use crate::auth::{verify_token, AuthUser};
use crate::error::Result;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use huddle_protocol::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use uuid::Uuid;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_direct(sender: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            return false;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}

fn error_message(code: &str, message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error {
        code: code.to_string(),
        message: message.into(),
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // First message must authenticate
    let auth_msg = match receiver.next().await {
        Some(Ok(Message::Text(text))) => text,
        _ => {
            tracing::warn!("WebSocket closed before authentication");
            return;
        }
    };

    let caller = match serde_json::from_str::<ClientMessage>(&auth_msg) {
        Ok(ClientMessage::Authenticate { token }) => {
            match verify_token(&token, &state.config.jwt_secret) {
                Ok(claims) => AuthUser::from(claims),
                Err(_) => {
                    send_direct(&mut sender, &error_message("unauthorized", "Invalid token")).await;
                    return;
                }
            }
        }
        Ok(_) => {
            send_direct(
                &mut sender,
                &error_message("unauthorized", "First message must be authentication"),
            )
            .await;
            return;
        }
        Err(e) => {
            tracing::warn!("Invalid auth message: {}", e);
            send_direct(&mut sender, &error_message("bad_request", "Invalid message format")).await;
            return;
        }
    };

    let connection_id = Uuid::new_v4();
    if !send_direct(&mut sender, &ServerMessage::Authenticated { connection_id }).await {
        return;
    }

    tracing::info!(user_id = %caller.user_id, role = ?caller.role, %connection_id, "WebSocket authenticated");

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.connections.add_connection(connection_id, caller, tx).await;

    // Forward queued pushes to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(&state, &caller, connection_id, client_msg).await;
                }
                Err(e) => {
                    tracing::warn!(user_id = %caller.user_id, "Invalid message: {}", e);
                    state
                        .connections
                        .send_to_connection(connection_id, &error_message("bad_request", "Invalid message format"))
                        .await;
                }
            },
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::error!(user_id = %caller.user_id, "WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    state.connections.remove_connection(connection_id).await;
    send_task.abort();

    tracing::info!(user_id = %caller.user_id, %connection_id, "WebSocket disconnected");
}

async fn handle_client_message(
    state: &AppState,
    caller: &AuthUser,
    connection_id: Uuid,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Authenticate { .. } => {
            // Already authenticated
        }
        ClientMessage::SubscribeChannel { channel_id } => {
            let reply = match subscribe(state, caller, connection_id, channel_id).await {
                Ok(()) => ServerMessage::ChannelSubscribed { channel_id },
                Err(e) => {
                    let body = e.to_body();
                    error_message(&body.code, body.error)
                }
            };
            state.connections.send_to_connection(connection_id, &reply).await;
        }
        ClientMessage::UnsubscribeChannel { channel_id } => {
            state
                .connections
                .unsubscribe_from_channel(connection_id, channel_id)
                .await;
        }
        ClientMessage::Ping => {
            state
                .connections
                .send_to_connection(connection_id, &ServerMessage::Pong)
                .await;
        }
    }
}

/// Subscribe after the membership check, then check again. A withdrawal that
/// commits between the first check and the insert has already run its
/// unsubscribe, so the second check is what removes the late subscription.
async fn subscribe(
    state: &AppState,
    caller: &AuthUser,
    connection_id: Uuid,
    channel_id: Uuid,
) -> Result<()> {
    state.membership.authorize_channel(channel_id, caller).await?;
    state
        .connections
        .subscribe_to_channel(connection_id, channel_id)
        .await;

    if let Err(e) = state.membership.authorize_channel(channel_id, caller).await {
        state
            .connections
            .unsubscribe_from_channel(connection_id, channel_id)
            .await;
        return Err(e);
    }

    Ok(())
}
