//! Socket admission: claim consumption and JWT validation.
//!
//! Runs before the WebSocket upgrade so failures come back as normal HTTP
//! error bodies the client can read.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::Config;
use crate::error::{ApiError, ErrorCode};
use crate::store::{DirectoryStore, StoreError};
use crate::util::unique_strings;

/// The authenticated identity a socket is admitted under.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: String,
    pub session: Option<String>,
    pub channels: Vec<String>,
}

/// JWT payload accepted on connect: subject is the user, `sid` the optional
/// session, `channels` the initial subscriptions.
#[derive(Debug, Deserialize)]
struct JwtClaims {
    sub: String,
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    channels: Vec<String>,
    #[allow(dead_code)]
    exp: i64,
}

/// Authenticate a connect attempt. A claim is consumed atomically on use,
/// even when it turns out expired; a JWT is accepted only when a secret is
/// configured. Providing neither is an error. The configured default
/// channels are merged into the identity.
pub async fn authenticate(
    config: &Config,
    store: &DirectoryStore,
    claim_id: &str,
    jwt: &str,
) -> Result<Identity, ApiError> {
    let mut identity = if !claim_id.is_empty() {
        consume_claim(store, claim_id).await?
    } else if config.jwt_enabled() && !jwt.is_empty() {
        validate_jwt(&config.jwt_secret, jwt)?
    } else {
        return Err(ApiError::bad_request(ErrorCode::MissingAuthentication));
    };

    identity.channels.extend(config.default_channel_list());
    identity.channels = unique_strings(identity.channels);

    Ok(identity)
}

/// Look up and delete the claim in one pass. Expired claims are deleted
/// too, so a failed connect still burns the id.
async fn consume_claim(store: &DirectoryStore, claim_id: &str) -> Result<Identity, ApiError> {
    let claim = store
        .get_claim(claim_id)
        .await
        .map_err(|e| match e {
            StoreError::MalformedRecord(_) => ApiError::internal(ErrorCode::InvalidExpiration, e),
            other => ApiError::internal(ErrorCode::GettingClaim, other),
        })?
        .ok_or_else(|| ApiError::bad_request(ErrorCode::MissingClaim))?;

    let expired = claim.is_expired(chrono::Utc::now());

    store
        .delete_claim(&claim)
        .await
        .map_err(|e| ApiError::internal(ErrorCode::GettingClaim, e))?;

    if expired {
        return Err(ApiError::bad_request(ErrorCode::ExpiredClaim));
    }

    Ok(Identity {
        user: claim.user,
        session: claim.session,
        channels: claim.channels,
    })
}

fn validate_jwt(secret: &str, token: &str) -> Result<Identity, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| ApiError::bad_request(ErrorCode::InvalidJwt))?;

    if data.claims.sub.is_empty() {
        return Err(ApiError::bad_request(ErrorCode::InvalidJwt));
    }

    Ok(Identity {
        user: data.claims.sub,
        session: data.claims.sid.filter(|s| !s.is_empty()),
        channels: data.claims.channels,
    })
}
