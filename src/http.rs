//! HTTP plumbing shared by the API and worker routers: request-id
//! correlation, the health endpoint, and the success body helper.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::proto::REQUEST_ID_HEADER;

/// Correlation id for the current request: taken from the inbound
/// `X-Request-ID` header when present, minted otherwise, and echoed on the
/// response. Available to handlers as an extractor.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Middleware: attach a request id to the request extensions, wrap the
/// handler in a tracing span carrying it, and echo it on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Health check endpoint, mounted on both processes.
pub async fn ping_handler() -> &'static str {
    "pong"
}

/// The `{success: true}` body returned by mutation endpoints.
pub fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}
