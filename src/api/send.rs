//! Message sending (`POST /send`): the raw request body is forwarded
//! verbatim as the frame payload.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::api::dispatch::{encode_message, send_to_workers, PayloadKind};
use crate::api::resolve::resolve_workers;
use crate::api::ApiState;
use crate::error::{ApiError, ErrorCode};
use crate::http::{success, RequestId};
use crate::proto;
use crate::target::TargetQuery;

#[derive(Debug, Default, Deserialize)]
pub struct SendQuery {
    #[serde(flatten)]
    pub target: TargetQuery,
    /// Frame type: "text" (or "1") and "binary" (or "2") are accepted.
    #[serde(default, rename = "type")]
    pub message_type: String,
}

/// Parse the wire frame type. Numeric aliases are accepted for callers
/// that serialize enums as integers.
pub fn parse_message_type(raw: &str) -> Result<proto::MessageType, ApiError> {
    match raw {
        "text" | "1" => Ok(proto::MessageType::Text),
        "binary" | "2" => Ok(proto::MessageType::Binary),
        _ => Err(ApiError::bad_request(ErrorCode::InvalidMessageType)),
    }
}

/// Deliver the request body to every connection matched by the target.
/// Matching nothing is a success (nothing to deliver).
pub async fn send_handler(
    State(state): State<ApiState>,
    Query(query): Query<SendQuery>,
    request_id: RequestId,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if query.target.is_empty() {
        return Err(ApiError::bad_request(ErrorCode::MissingTarget));
    }
    let message_type = parse_message_type(&query.message_type)?;

    let worker_ids = resolve_workers(&state, &query.target).await?;

    let message = proto::Message {
        r#type: message_type as i32,
        body: body.to_vec(),
        target: Some(query.target.to_proto()),
    };
    let payload = encode_message(&message)?;

    send_to_workers(&state, &request_id, &worker_ids, PayloadKind::Message, &payload).await?;

    tracing::debug!(
        workers = worker_ids.len(),
        bytes = body.len(),
        "dispatched message"
    );

    Ok(success())
}
