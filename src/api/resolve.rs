//! Control-plane target resolution against the directory store.
//!
//! Turns an abstract target into the set of workers currently holding
//! matching sockets (`resolve_workers`) or the set of pending claims the
//! target covers (`resolve_claims`). All batch lookups go through one Redis
//! pipeline so latency stays bounded to a single round trip; a missing
//! connection skips only that entry. Empty results are never errors.

use crate::api::ApiState;
use crate::error::{ApiError, ErrorCode};
use crate::target::TargetQuery;
use crate::util::unique_strings;

/// Resolve the worker ids owning connections matched by `target`.
/// Selector precedence: connection id > channel > user(+session).
pub async fn resolve_workers(
    state: &ApiState,
    target: &TargetQuery,
) -> Result<Vec<String>, ApiError> {
    if !target.id.is_empty() {
        let connection = state
            .store
            .get_connection(&target.id)
            .await
            .map_err(|e| ApiError::internal(ErrorCode::GettingConnection, e))?;

        // Absent connection: empty result, not an error
        return Ok(connection
            .map(|record| vec![record.worker_id])
            .unwrap_or_default());
    }

    if !target.channel.is_empty() {
        let connection_ids = state
            .store
            .channel_connections(&target.channel)
            .await
            .map_err(|e| ApiError::internal(ErrorCode::GettingChannel, e))?;

        return workers_for_connections(state, connection_ids, &target.session).await;
    }

    if !target.user.is_empty() {
        let connection_ids = state
            .store
            .user_connections(&target.user)
            .await
            .map_err(|e| ApiError::internal(ErrorCode::GettingUser, e))?;

        return workers_for_connections(state, connection_ids, &target.session).await;
    }

    Err(ApiError::bad_request(ErrorCode::MissingTarget))
}

/// Batch-resolve connection ids to their owning workers, dropping entries
/// whose record has expired and, when a session filter is given, entries
/// belonging to another session.
async fn workers_for_connections(
    state: &ApiState,
    connection_ids: Vec<String>,
    session: &str,
) -> Result<Vec<String>, ApiError> {
    if connection_ids.is_empty() {
        return Ok(Vec::new());
    }

    let connections = state
        .store
        .get_connections(&connection_ids)
        .await
        .map_err(|e| ApiError::internal(ErrorCode::GettingConnection, e))?;

    let mut worker_ids = Vec::new();
    for connection in connections.into_iter().flatten() {
        if !session.is_empty() && connection.session.as_deref() != Some(session) {
            continue;
        }
        worker_ids.push(connection.worker_id);
    }

    Ok(unique_strings(worker_ids))
}

/// Resolve the pending (not-yet-consumed) claim ids covered by `target`,
/// from the claim indexes. A connection-id target has no claims; no
/// selector resolves to an empty list (claims are optional on most paths).
pub async fn resolve_claims(
    state: &ApiState,
    target: &TargetQuery,
) -> Result<Vec<String>, ApiError> {
    let result = if !target.channel.is_empty() {
        state.store.claims_for_channel(&target.channel).await
    } else if !target.user.is_empty() && !target.session.is_empty() {
        state
            .store
            .claims_for_user_session(&target.user, &target.session)
            .await
    } else if !target.user.is_empty() {
        state.store.claims_for_user(&target.user).await
    } else {
        return Ok(Vec::new());
    };

    result.map_err(|e| ApiError::internal(ErrorCode::GettingClaim, e))
}
