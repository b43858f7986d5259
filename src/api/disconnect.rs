//! Forced disconnect (`POST /disconnect`): closes matching sockets and, by
//! default, expires the target's pending claims so the user cannot
//! immediately reconnect with one.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::api::dispatch::{encode_message, send_to_workers, PayloadKind};
use crate::api::resolve::{resolve_claims, resolve_workers};
use crate::api::ApiState;
use crate::error::{ApiError, ErrorCode};
use crate::http::{success, RequestId};
use crate::proto;
use crate::target::TargetQuery;

#[derive(Debug, Default, Deserialize)]
pub struct DisconnectQuery {
    #[serde(flatten)]
    pub target: TargetQuery,
    /// "true" leaves the target's pending claims usable.
    #[serde(default, rename = "keepClaims")]
    pub keep_claims: String,
}

pub async fn disconnect_handler(
    State(state): State<ApiState>,
    Query(query): Query<DisconnectQuery>,
    request_id: RequestId,
) -> Result<impl IntoResponse, ApiError> {
    if query.target.is_empty() {
        return Err(ApiError::bad_request(ErrorCode::MissingTarget));
    }

    if query.keep_claims != "true" {
        let claim_ids = resolve_claims(&state, &query.target).await?;
        if !claim_ids.is_empty() {
            state
                .store
                .purge_claims(
                    &claim_ids,
                    &query.target.user,
                    &query.target.session,
                    &query.target.channel,
                )
                .await
                .map_err(|e| ApiError::internal(ErrorCode::GettingClaim, e))?;
            tracing::debug!(claims = claim_ids.len(), "expired pending claims");
        }
    }

    let worker_ids = resolve_workers(&state, &query.target).await?;

    let message = proto::Message {
        r#type: proto::MessageType::Disconnect as i32,
        body: Vec::new(),
        target: Some(query.target.to_proto()),
    };
    let payload = encode_message(&message)?;

    send_to_workers(&state, &request_id, &worker_ids, PayloadKind::Message, &payload).await?;

    Ok(success())
}
