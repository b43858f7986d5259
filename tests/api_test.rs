//! Integration tests for the control router's validation paths. Every
//! request here is rejected before any store access, so no Redis is needed;
//! the store handle points at a port nothing listens on.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use tokio::net::TcpListener;

use sockgate::api::{routes, ApiState};
use sockgate::config::Config;
use sockgate::store::DirectoryStore;

const TOKEN: &str = "test-token";

async fn start_api() -> String {
    let mut config = Config::default();
    config.token = TOKEN.to_string();
    config.redis_url = "redis://127.0.0.1:1".to_string();

    let store = DirectoryStore::open(&config.redis_url).unwrap();
    let state = ApiState::new(Arc::new(config), store);
    let app = routes::build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{addr}")
}

async fn error_code(response: reqwest::Response) -> String {
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    body["errorCode"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn ping_is_unguarded() {
    let api = start_api().await;
    let response = reqwest::get(format!("{api}/ping")).await.unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "pong");
}

#[tokio::test]
async fn token_guard_rejects_missing_and_wrong_tokens() {
    let api = start_api().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{api}/send?user=alice&type=text"))
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "INVALID_AUTHORIZATION");

    let response = client
        .post(format!("{api}/send?token=wrong&user=alice&type=text"))
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "INVALID_AUTHORIZATION");

    let response = client
        .post(format!("{api}/send?user=alice&type=text"))
        .header("Authorization", "Bearer wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "INVALID_AUTHORIZATION");
}

#[tokio::test]
async fn send_requires_target_and_valid_type() {
    let api = start_api().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{api}/send?token={TOKEN}&type=text"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "MISSING_TARGET");

    // A session alone is a filter, not a selector
    let response = client
        .post(format!("{api}/send?token={TOKEN}&session=phone&type=text"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "MISSING_TARGET");

    let response = client
        .post(format!("{api}/send?token={TOKEN}&user=alice&type=carrier-pigeon"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "INVALID_MESSAGE_TYPE");
}

#[tokio::test]
async fn disconnect_and_info_require_target() {
    let api = start_api().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{api}/disconnect?token={TOKEN}&keepClaims=true"))
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "MISSING_TARGET");

    let response = client
        .get(format!("{api}/info?token={TOKEN}"))
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "MISSING_TARGET");
}

#[tokio::test]
async fn channel_actions_require_target() {
    let api = start_api().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!(
            "{api}/channel/subscribe/news?token={TOKEN}&ignoreClaims=true"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "MISSING_TARGET");
}

#[tokio::test]
async fn claim_validation_rejects_before_store_access() {
    let api = start_api().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{api}/claim?token={TOKEN}"))
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "USER_ID_REQUIRED");

    let response = client
        .post(format!("{api}/claim?token={TOKEN}&user=alice&expiration=soon"))
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "INVALID_EXPIRATION");

    // An absolute expiration already in the past is unusable
    let response = client
        .post(format!("{api}/claim?token={TOKEN}&user=alice&expiration=1000"))
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "INVALID_EXPIRATION");

    let response = client
        .post(format!("{api}/claim?token={TOKEN}&user=alice&duration=0"))
        .send()
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "NEGATIVE_DURATION");
}

#[tokio::test]
async fn error_responses_echo_request_id() {
    let api = start_api().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{api}/info?token={TOKEN}"))
        .header("X-Request-ID", "req-123")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("X-Request-ID").unwrap(),
        "req-123"
    );
}
