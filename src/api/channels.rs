//! Channel membership management (`POST /channel/subscribe/{channel}` and
//! `POST /channel/unsubscribe/{channel}`).
//!
//! Changes apply to live connections (via the owning workers) and, unless
//! opted out, to pending claims so a socket connecting later still lands in
//! the right channels.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::api::dispatch::{encode_channel_action, send_to_workers, PayloadKind};
use crate::api::resolve::{resolve_claims, resolve_workers};
use crate::api::ApiState;
use crate::error::{ApiError, ErrorCode};
use crate::http::{success, RequestId};
use crate::proto;
use crate::store::ClaimChannelUpdate;
use crate::target::TargetQuery;
use crate::util::remove_string;

#[derive(Debug, Default, Deserialize)]
pub struct ChannelQuery {
    #[serde(flatten)]
    pub target: TargetQuery,
    /// "true" leaves pending claims untouched.
    #[serde(default, rename = "ignoreClaims")]
    pub ignore_claims: String,
}

pub async fn subscribe_handler(
    State(state): State<ApiState>,
    Path(channel): Path<String>,
    Query(query): Query<ChannelQuery>,
    request_id: RequestId,
) -> Result<impl IntoResponse, ApiError> {
    channel_handler(&state, &request_id, &channel, &query, true).await
}

pub async fn unsubscribe_handler(
    State(state): State<ApiState>,
    Path(channel): Path<String>,
    Query(query): Query<ChannelQuery>,
    request_id: RequestId,
) -> Result<impl IntoResponse, ApiError> {
    channel_handler(&state, &request_id, &channel, &query, false).await
}

async fn channel_handler(
    state: &ApiState,
    request_id: &RequestId,
    channel: &str,
    query: &ChannelQuery,
    subscribe: bool,
) -> Result<impl IntoResponse, ApiError> {
    if query.target.is_empty() {
        return Err(ApiError::bad_request(ErrorCode::MissingTarget));
    }

    if query.ignore_claims != "true" {
        update_pending_claims(state, &query.target, channel, subscribe).await?;
    }

    let worker_ids = resolve_workers(state, &query.target).await?;

    let action_type = if subscribe {
        proto::ChannelActionType::Subscribe
    } else {
        proto::ChannelActionType::Unsubscribe
    };
    let action = proto::ChannelAction {
        r#type: action_type as i32,
        channel: channel.to_string(),
        target: Some(query.target.to_proto()),
    };
    let payload = encode_channel_action(&action)?;

    send_to_workers(
        state,
        request_id,
        &worker_ids,
        PayloadKind::ChannelAction,
        &payload,
    )
    .await?;

    Ok(success())
}

/// Mirror the membership change onto the target's pending claims. Claims
/// already in the desired state are left alone so the by-channel index is
/// only touched on an actual transition.
async fn update_pending_claims(
    state: &ApiState,
    target: &TargetQuery,
    channel: &str,
    subscribe: bool,
) -> Result<(), ApiError> {
    let claim_ids = resolve_claims(state, target).await?;
    if claim_ids.is_empty() {
        return Ok(());
    }

    let claims = state
        .store
        .get_claims(&claim_ids)
        .await
        .map_err(|e| ApiError::internal(ErrorCode::GettingClaim, e))?;

    let mut updates = Vec::new();
    for claim in claims.into_iter().flatten() {
        let subscribed = claim.channels.iter().any(|c| c == channel);
        if subscribed == subscribe {
            continue;
        }

        let mut channels = claim.channels;
        if subscribe {
            channels.push(channel.to_string());
        } else {
            remove_string(&mut channels, channel);
        }

        updates.push(ClaimChannelUpdate {
            claim_id: claim.id,
            channel: channel.to_string(),
            subscribe,
            channels,
        });
    }

    state
        .store
        .apply_claim_channel_updates(&updates)
        .await
        .map_err(|e| ApiError::internal(ErrorCode::GettingClaim, e))?;

    if !updates.is_empty() {
        tracing::debug!(claims = updates.len(), channel = %channel, "updated pending claims");
    }

    Ok(())
}
