//! Structured API errors.
//!
//! Every failure surfaced to an API caller carries a stable machine-readable
//! code plus a human-readable message, so upstream services can branch on
//! `errorCode` without parsing prose.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Stable error codes. The string forms are part of the public API contract
/// and must never change for an existing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UserIdRequired,
    InvalidExpiration,
    NegativeExpiration,
    InvalidDuration,
    NegativeDuration,
    GettingConnection,
    GettingUser,
    GettingChannel,
    MissingTarget,
    InvalidAuthorization,
    MissingAuthentication,
    InvalidJwt,
    ClaimIdAlreadyUsed,
    CheckingClaim,
    CreatingClaim,
    GettingClaim,
    MissingClaim,
    ExpiredClaim,
    ReadingMessage,
    MarshallingMessage,
    InvalidMessageType,
    DeliveringMessage,
    ReachingWorker,
    InvalidContentType,
    ReadingBody,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UserIdRequired => "USER_ID_REQUIRED",
            ErrorCode::InvalidExpiration => "INVALID_EXPIRATION",
            ErrorCode::NegativeExpiration => "NEGATIVE_EXPIRATION",
            ErrorCode::InvalidDuration => "INVALID_DURATION",
            ErrorCode::NegativeDuration => "NEGATIVE_DURATION",
            ErrorCode::GettingConnection => "ERROR_GETTING_CONNECTION",
            ErrorCode::GettingUser => "ERROR_GETTING_USER",
            ErrorCode::GettingChannel => "ERROR_GETTING_CHANNEL",
            ErrorCode::MissingTarget => "MISSING_TARGET",
            ErrorCode::InvalidAuthorization => "INVALID_AUTHORIZATION",
            ErrorCode::MissingAuthentication => "MISSING_AUTHENTICATION",
            ErrorCode::InvalidJwt => "INVALID_JWT",
            ErrorCode::ClaimIdAlreadyUsed => "CLAIM_ID_ALREADY_USED",
            ErrorCode::CheckingClaim => "ERROR_CHECKING_CLAIM",
            ErrorCode::CreatingClaim => "ERROR_CREATING_CLAIM",
            ErrorCode::GettingClaim => "ERROR_GETTING_CLAIM",
            ErrorCode::MissingClaim => "MISSING_CLAIM",
            ErrorCode::ExpiredClaim => "EXPIRED_CLAIM",
            ErrorCode::ReadingMessage => "ERROR_READING_MESSAGE",
            ErrorCode::MarshallingMessage => "ERROR_MARSHALLING_MESSAGE",
            ErrorCode::InvalidMessageType => "INVALID_MESSAGE_TYPE",
            ErrorCode::DeliveringMessage => "ERROR_DELIVERING_MESSAGE",
            ErrorCode::ReachingWorker => "ERROR_REACHING_WORKER",
            ErrorCode::InvalidContentType => "INVALID_CONTENT_TYPE",
            ErrorCode::ReadingBody => "ERROR_READING_BODY",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::UserIdRequired => "User ID is required",
            ErrorCode::InvalidExpiration => "Error parsing expiration (must be an integer)",
            ErrorCode::NegativeExpiration => "Can not use 0 or negative expiration",
            ErrorCode::InvalidDuration => "Could not parse duration (must be an integer)",
            ErrorCode::NegativeDuration => "Can not use 0 or negative duration",
            ErrorCode::GettingConnection => "Error getting connection",
            ErrorCode::GettingUser => "Error getting user",
            ErrorCode::GettingChannel => "Error getting channel",
            ErrorCode::MissingTarget => "No target provided (connection ID, user, or channel)",
            ErrorCode::InvalidAuthorization => "Invalid authorization",
            ErrorCode::MissingAuthentication => "Did not provide an authentication method",
            ErrorCode::InvalidJwt => "Could not validate JWT",
            ErrorCode::ClaimIdAlreadyUsed => "Claim ID is already used",
            ErrorCode::CheckingClaim => "Error checking if claim already exists",
            ErrorCode::CreatingClaim => "Error creating claim",
            ErrorCode::GettingClaim => "Error getting claim",
            ErrorCode::MissingClaim => "Could not find claim",
            ErrorCode::ExpiredClaim => "Claim has expired",
            ErrorCode::ReadingMessage => "Error reading message",
            ErrorCode::MarshallingMessage => "Error marshalling message",
            ErrorCode::InvalidMessageType => "Invalid message type, must be text or binary",
            ErrorCode::DeliveringMessage => "Error delivering message to worker",
            ErrorCode::ReachingWorker => "Error reaching worker",
            ErrorCode::InvalidContentType => "Invalid content type",
            ErrorCode::ReadingBody => "Error reading request body",
        }
    }
}

/// An API-visible failure: a stable code, an HTTP status, and an optional
/// message override (used when the default message lacks context).
#[derive(Debug)]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: StatusCode,
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, status: StatusCode) -> Self {
        Self {
            code,
            status,
            message: None,
        }
    }

    /// Validation failure: rejected before any store access.
    pub fn bad_request(code: ErrorCode) -> Self {
        Self::new(code, StatusCode::BAD_REQUEST)
    }

    /// Upstream failure (store unreachable, serialization, unreachable
    /// worker). Logs the underlying error; the response body only carries
    /// the stable code and default message.
    pub fn internal(code: ErrorCode, source: impl std::fmt::Display) -> Self {
        tracing::error!(error_code = code.as_str(), error = %source, "internal error");
        Self::new(code, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The `{success, errorCode, error}` body sent to callers.
    pub fn body(&self) -> serde_json::Value {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| self.code.default_message().to_string());

        json!({
            "success": false,
            "errorCode": self.code.as_str(),
            "error": message,
        })
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.code.as_str(), message),
            None => f.write_str(self.code.as_str()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_uses_default_message() {
        let err = ApiError::bad_request(ErrorCode::UserIdRequired);
        let body = err.body();

        assert_eq!(body["success"], false);
        assert_eq!(body["errorCode"], "USER_ID_REQUIRED");
        assert_eq!(body["error"], "User ID is required");
    }

    #[test]
    fn body_uses_message_override() {
        let err = ApiError::bad_request(ErrorCode::DeliveringMessage)
            .with_message("2 workers unreachable");
        let body = err.body();

        assert_eq!(body["errorCode"], "ERROR_DELIVERING_MESSAGE");
        assert_eq!(body["error"], "2 workers unreachable");
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::bad_request(ErrorCode::MissingTarget).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::internal(ErrorCode::GettingClaim, "boom").status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
