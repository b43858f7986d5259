//! Control-plane router and its bearer-token guard.

use axum::extract::{Query, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{any, get, post};
use axum::Router;
use serde::Deserialize;

use crate::api::{channels, claims, disconnect, info, send, ApiState};
use crate::error::{ApiError, ErrorCode};
use crate::http::{ping_handler, request_id_middleware};

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    #[serde(default)]
    token: String,
}

/// Require the configured bearer token on every control endpoint, accepted
/// either as the `token` query parameter or an `Authorization: Bearer`
/// header. An empty configured token disables the check.
async fn require_token(
    State(state): State<ApiState>,
    Query(query): Query<TokenQuery>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.config.token.is_empty() {
        return Ok(next.run(req).await);
    }

    let header_token = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or("");

    let presented = if !query.token.is_empty() {
        query.token.as_str()
    } else {
        header_token
    };

    if presented != state.config.token {
        return Err(ApiError::bad_request(ErrorCode::InvalidAuthorization));
    }

    Ok(next.run(req).await)
}

pub fn build_router(state: ApiState) -> Router {
    let guarded = Router::new()
        .route("/claim", post(claims::create_claim_handler))
        .route("/send", post(send::send_handler))
        .route("/disconnect", post(disconnect::disconnect_handler))
        .route("/info", get(info::info_handler))
        .route("/channel/subscribe/{channel}", post(channels::subscribe_handler))
        .route(
            "/channel/unsubscribe/{channel}",
            post(channels::unsubscribe_handler),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/ping", any(ping_handler))
        .merge(guarded)
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
