//! Applying control-plane payloads to local sockets.
//!
//! Payloads arrive either over pub/sub (see `relay`) or on the direct-mode
//! receive endpoints below. Both paths end in `handle_message` /
//! `handle_channel_action`, which resolve the embedded target against the
//! in-memory registry and act on every matching socket.

use axum::body::Bytes;
use axum::extract::ws;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use prost::Message as _;

use crate::error::{ApiError, ErrorCode};
use crate::http::success;
use crate::proto::{self, PROTOBUF_CONTENT_TYPE};
use crate::target::TargetQuery;
use crate::worker::WorkerState;

/// Deliver a message to every local socket the target matches. Disconnect
/// orders close the socket instead of writing a frame.
pub async fn handle_message(state: &WorkerState, message: &proto::Message) {
    let Some(target) = &message.target else {
        return;
    };
    let target = TargetQuery::from_proto(target);

    let connections = state.registry.resolve_local(&target);
    if connections.is_empty() {
        return;
    }

    let disconnect = message.r#type() == proto::MessageType::Disconnect;
    tracing::debug!(
        matched = connections.len(),
        disconnect,
        "applying message to local sockets"
    );

    for connection in connections {
        if disconnect {
            connection.close();
            continue;
        }

        let frame = match message.r#type() {
            proto::MessageType::Text => ws::Message::Text(
                String::from_utf8_lossy(&message.body).into_owned().into(),
            ),
            proto::MessageType::Binary => ws::Message::Binary(message.body.clone().into()),
            proto::MessageType::Disconnect => continue,
        };

        // Send only fails while the socket is tearing down
        connection.send(frame);
    }
}

/// Apply a subscribe/unsubscribe to every local socket the target matches,
/// mirroring actual transitions to the store.
pub async fn handle_channel_action(state: &WorkerState, action: &proto::ChannelAction) {
    let Some(target) = &action.target else {
        return;
    };
    let target = TargetQuery::from_proto(target);
    let subscribe = action.r#type() == proto::ChannelActionType::Subscribe;

    for connection in state.registry.resolve_local(&target) {
        let changed = if subscribe {
            state.registry.subscribe(&connection, &action.channel)
        } else {
            state.registry.unsubscribe(&connection, &action.channel)
        };
        if !changed {
            continue;
        }

        if let Err(error) = state
            .store
            .set_connection_channels(
                &connection.id,
                &action.channel,
                subscribe,
                &connection.channels(),
            )
            .await
        {
            tracing::error!(
                connection_id = %connection.id,
                channel = %action.channel,
                error = %error,
                "failed to mirror channel change"
            );
        }
    }
}

fn require_protobuf(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get("Content-Type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if content_type != PROTOBUF_CONTENT_TYPE {
        return Err(ApiError::bad_request(ErrorCode::InvalidContentType));
    }
    Ok(())
}

/// Direct-mode receive endpoint for messages (`POST /_/message`).
pub async fn receive_message_handler(
    State(state): State<WorkerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    require_protobuf(&headers)?;

    let message = proto::Message::decode(body.as_ref())
        .map_err(|e| ApiError::bad_request(ErrorCode::ReadingBody).with_message(e.to_string()))?;

    handle_message(&state, &message).await;
    Ok(success())
}

/// Direct-mode receive endpoint for channel actions
/// (`POST /_/message/channel`).
pub async fn receive_channel_action_handler(
    State(state): State<WorkerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    require_protobuf(&headers)?;

    let action = proto::ChannelAction::decode(body.as_ref())
        .map_err(|e| ApiError::bad_request(ErrorCode::ReadingBody).with_message(e.to_string()))?;

    handle_channel_action(&state, &action).await;
    Ok(success())
}
