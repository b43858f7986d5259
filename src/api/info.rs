//! Introspection (`GET /info`): a point-in-time snapshot of the
//! connections and pending claims a target matches, for debugging and
//! backend bookkeeping.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::api::resolve::resolve_claims;
use crate::api::ApiState;
use crate::error::{ApiError, ErrorCode};
use crate::store::{ClaimRecord, ConnectionRecord};
use crate::target::TargetQuery;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub id: String,
    pub worker: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub channels: Vec<String>,
    /// Unix timestamp of the last liveness signal.
    pub last_ping: i64,
}

impl From<ConnectionRecord> for ConnectionInfo {
    fn from(record: ConnectionRecord) -> Self {
        Self {
            id: record.id,
            worker: record.worker_id,
            user: record.user,
            session: record.session,
            channels: record.channels,
            last_ping: record.last_ping.timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimInfo {
    pub id: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub channels: Vec<String>,
    /// Unix timestamp after which the claim is unusable.
    pub expiration: i64,
}

impl From<ClaimRecord> for ClaimInfo {
    fn from(record: ClaimRecord) -> Self {
        Self {
            id: record.id,
            user: record.user,
            session: record.session,
            channels: record.channels,
            expiration: record.expiration.timestamp(),
        }
    }
}

pub async fn info_handler(
    State(state): State<ApiState>,
    Query(target): Query<TargetQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if target.is_empty() {
        return Err(ApiError::bad_request(ErrorCode::MissingTarget));
    }

    let connections = matching_connections(&state, &target).await?;

    // Expired-but-not-yet-evicted claims are invisible to callers
    let claim_ids = resolve_claims(&state, &target).await?;
    let now = Utc::now();
    let claims: Vec<ClaimInfo> = state
        .store
        .get_claims(&claim_ids)
        .await
        .map_err(|e| ApiError::internal(ErrorCode::GettingClaim, e))?
        .into_iter()
        .flatten()
        .filter(|claim| !claim.is_expired(now))
        .map(ClaimInfo::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "connections": connections,
        "claims": claims,
    })))
}

/// Fetch the connection records the target matches, applying the session
/// filter to the user and channel selectors.
async fn matching_connections(
    state: &ApiState,
    target: &TargetQuery,
) -> Result<Vec<ConnectionInfo>, ApiError> {
    if !target.id.is_empty() {
        let connection = state
            .store
            .get_connection(&target.id)
            .await
            .map_err(|e| ApiError::internal(ErrorCode::GettingConnection, e))?;
        return Ok(connection.into_iter().map(ConnectionInfo::from).collect());
    }

    let connection_ids = if !target.channel.is_empty() {
        state
            .store
            .channel_connections(&target.channel)
            .await
            .map_err(|e| ApiError::internal(ErrorCode::GettingChannel, e))?
    } else {
        state
            .store
            .user_connections(&target.user)
            .await
            .map_err(|e| ApiError::internal(ErrorCode::GettingUser, e))?
    };

    let connections = state
        .store
        .get_connections(&connection_ids)
        .await
        .map_err(|e| ApiError::internal(ErrorCode::GettingConnection, e))?;

    Ok(connections
        .into_iter()
        .flatten()
        .filter(|record| {
            target.session.is_empty() || record.session.as_deref() == Some(&target.session)
        })
        .map(ConnectionInfo::from)
        .collect())
}
