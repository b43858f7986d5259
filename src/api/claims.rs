//! Claim minting (`POST /claim`).

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::api::ApiState;
use crate::error::{ApiError, ErrorCode};
use crate::store::ClaimRecord;
use crate::util::{random_claim_id, split_channels, unique_strings};

/// A claim lives this long when neither `expiration` nor `duration` is
/// supplied.
const DEFAULT_CLAIM_LIFETIME_SECONDS: i64 = 60;

#[derive(Debug, Default, Deserialize)]
pub struct ClaimQuery {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub session: String,
    /// Caller-chosen claim id; generated when empty.
    #[serde(default)]
    pub id: String,
    /// Absolute expiration as a unix timestamp in seconds.
    #[serde(default)]
    pub expiration: String,
    /// Relative lifetime in seconds; only consulted when `expiration` is
    /// empty.
    #[serde(default)]
    pub duration: String,
    /// Comma-separated channels the claimed connection subscribes to.
    #[serde(default)]
    pub channels: String,
}

/// Compute the claim expiration from the raw query values. `expiration`
/// wins over `duration`; both must be positive integers.
pub fn parse_claim_expiration(
    expiration: &str,
    duration: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ApiError> {
    if !expiration.is_empty() {
        let unix: i64 = expiration
            .parse()
            .map_err(|_| ApiError::bad_request(ErrorCode::InvalidExpiration))?;
        if unix <= 0 {
            return Err(ApiError::bad_request(ErrorCode::NegativeExpiration));
        }
        let time = DateTime::from_timestamp(unix, 0)
            .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidExpiration))?;
        // An absolute expiration in the past would mint a claim that can
        // never be used
        if time < now {
            return Err(ApiError::bad_request(ErrorCode::InvalidExpiration));
        }
        return Ok(time);
    }

    if !duration.is_empty() {
        let seconds: i64 = duration
            .parse()
            .map_err(|_| ApiError::bad_request(ErrorCode::InvalidDuration))?;
        if seconds <= 0 {
            return Err(ApiError::bad_request(ErrorCode::NegativeDuration));
        }
        return Ok(now + Duration::seconds(seconds));
    }

    Ok(now + Duration::seconds(DEFAULT_CLAIM_LIFETIME_SECONDS))
}

/// Mint a one-time claim for a user (optionally scoped to a session and
/// pre-subscribed to channels). The id is single-use: handing out an id
/// that is still pending is rejected.
pub async fn create_claim_handler(
    State(state): State<ApiState>,
    Query(query): Query<ClaimQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query.user.is_empty() {
        return Err(ApiError::bad_request(ErrorCode::UserIdRequired));
    }

    let expiration = parse_claim_expiration(&query.expiration, &query.duration, Utc::now())?;

    let id = if query.id.is_empty() {
        random_claim_id()
    } else {
        let exists = state
            .store
            .claim_exists(&query.id)
            .await
            .map_err(|e| ApiError::internal(ErrorCode::CheckingClaim, e))?;
        if exists {
            return Err(ApiError::bad_request(ErrorCode::ClaimIdAlreadyUsed));
        }
        query.id.clone()
    };

    let mut channels = split_channels(&query.channels);
    channels.extend(state.config.default_channel_list());
    let channels = unique_strings(channels);

    let claim = ClaimRecord {
        id,
        user: query.user.clone(),
        session: Some(query.session.clone()).filter(|s| !s.is_empty()),
        channels,
        expiration,
    };

    state
        .store
        .create_claim(&claim)
        .await
        .map_err(|e| ApiError::internal(ErrorCode::CreatingClaim, e))?;

    tracing::debug!(claim_id = %claim.id, user = %claim.user, "created claim");

    let mut body = json!({
        "id": claim.id,
        "user": claim.user,
        "channels": claim.channels,
        "expiration": claim.expiration.timestamp(),
    });
    if let Some(session) = &claim.session {
        body["session"] = json!(session);
    }

    Ok(Json(json!({ "success": true, "claim": body })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiration_beats_duration() {
        let now = Utc::now();
        let unix = now.timestamp() + 3600;
        let expiration =
            parse_claim_expiration(&unix.to_string(), "9999", now).unwrap();
        assert_eq!(expiration.timestamp(), unix);
    }

    #[test]
    fn duration_is_relative_to_now() {
        let now = Utc::now();
        let expiration = parse_claim_expiration("", "120", now).unwrap();
        assert_eq!((expiration - now).num_seconds(), 120);
    }

    #[test]
    fn default_lifetime_applies() {
        let now = Utc::now();
        let expiration = parse_claim_expiration("", "", now).unwrap();
        assert_eq!(
            (expiration - now).num_seconds(),
            DEFAULT_CLAIM_LIFETIME_SECONDS
        );
    }

    #[test]
    fn rejects_bad_values() {
        let now = Utc::now();
        assert_eq!(
            parse_claim_expiration("soon", "", now).unwrap_err().code,
            ErrorCode::InvalidExpiration
        );
        assert_eq!(
            parse_claim_expiration("0", "", now).unwrap_err().code,
            ErrorCode::NegativeExpiration
        );
        // Absolute expirations already in the past are unusable
        assert_eq!(
            parse_claim_expiration("1000", "", now).unwrap_err().code,
            ErrorCode::InvalidExpiration
        );
        let past = (now.timestamp() - 60).to_string();
        assert_eq!(
            parse_claim_expiration(&past, "", now).unwrap_err().code,
            ErrorCode::InvalidExpiration
        );
        assert_eq!(
            parse_claim_expiration("", "later", now).unwrap_err().code,
            ErrorCode::InvalidDuration
        );
        assert_eq!(
            parse_claim_expiration("", "-5", now).unwrap_err().code,
            ErrorCode::NegativeDuration
        );
    }
}
