//! End-to-end tests running both planes against a real Redis.
//!
//! All tests are ignored by default; run them with a local Redis:
//!
//! ```sh
//! cargo test -- --ignored
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use sockgate::api::{routes as api_routes, ApiState};
use sockgate::config::Config;
use sockgate::store::DirectoryStore;
use sockgate::worker::{relay, routes as worker_routes, WorkerState};

const REDIS_URL: &str = "redis://localhost:6379";
const TOKEN: &str = "test-token";

fn test_config() -> Config {
    let mut config = Config::default();
    config.redis_url = REDIS_URL.to_string();
    config.token = TOKEN.to_string();
    config
}

async fn start_api(config: Config) -> String {
    let store = DirectoryStore::open(&config.redis_url).unwrap();
    store
        .ping()
        .await
        .expect("redis must be running for ignored tests");
    let state = ApiState::new(Arc::new(config), store);
    let app = api_routes::build_router(state);

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

async fn start_worker(config: Config) -> (String, WorkerState) {
    let store = DirectoryStore::open(&config.redis_url).unwrap();
    store
        .ping()
        .await
        .expect("redis must be running for ignored tests");
    let state = WorkerState::new(Arc::new(config), store.clone());

    store
        .register_worker(&state.worker_id, None, state.record_ttl_seconds())
        .await
        .unwrap();
    relay::spawn_subscribers(state.clone(), tokio_util::sync::CancellationToken::new())
        .await
        .unwrap();

    let app = worker_routes::build_router(state.clone());
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

    (format!("127.0.0.1:{}", addr.port()), state)
}

async fn mint_claim(client: &reqwest::Client, api: &str, query: &str) -> Value {
    let response = client
        .post(format!("{api}/claim?token={TOKEN}&{query}"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn token_guard_rejects_bad_credentials() {
    let api = start_api(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{api}/info?user=nobody"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], "INVALID_AUTHORIZATION");

    // Bearer header works as well as the query parameter
    let response = client
        .get(format!("{api}/info?user=nobody"))
        .header("Authorization", format!("Bearer {TOKEN}"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn claim_is_single_use() {
    let config = test_config();
    let api = start_api(config.clone()).await;
    let (worker, _state) = start_worker(config).await;
    let client = reqwest::Client::new();

    let body = mint_claim(&client, &api, "user=single-use-user").await;
    let claim_id = body["claim"]["id"].as_str().unwrap().to_string();

    let (_socket, _) =
        tokio_tungstenite::connect_async(format!("ws://{worker}/connect?claim={claim_id}"))
            .await
            .unwrap();

    // Second use of the same claim id is rejected before upgrade
    let error = tokio_tungstenite::connect_async(format!("ws://{worker}/connect?claim={claim_id}"))
        .await
        .unwrap_err();
    match error {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 400);
        }
        other => panic!("expected HTTP rejection, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn send_reaches_connected_socket() {
    let config = test_config();
    let api = start_api(config.clone()).await;
    let (worker, _state) = start_worker(config).await;
    let client = reqwest::Client::new();

    let body = mint_claim(&client, &api, "user=send-user&session=phone").await;
    let claim_id = body["claim"]["id"].as_str().unwrap();

    let (mut socket, _) =
        tokio_tungstenite::connect_async(format!("ws://{worker}/connect?claim={claim_id}"))
            .await
            .unwrap();

    let response = client
        .post(format!(
            "{api}/send?token={TOKEN}&user=send-user&type=text"
        ))
        .body("hello there")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("frame within deadline")
        .unwrap()
        .unwrap();
    assert_eq!(frame, Message::Text("hello there".into()));

    // Session filter excludes other sessions
    let response = client
        .post(format!(
            "{api}/send?token={TOKEN}&user=send-user&session=laptop&type=text"
        ))
        .body("wrong session")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(
        tokio::time::timeout(Duration::from_millis(500), socket.next())
            .await
            .is_err()
    );
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn channel_membership_round_trip() {
    let config = test_config();
    let api = start_api(config.clone()).await;
    let (worker, _state) = start_worker(config).await;
    let client = reqwest::Client::new();

    let body = mint_claim(&client, &api, "user=chan-user").await;
    let claim_id = body["claim"]["id"].as_str().unwrap();

    let (mut socket, _) =
        tokio_tungstenite::connect_async(format!("ws://{worker}/connect?claim={claim_id}"))
            .await
            .unwrap();

    let response = client
        .post(format!(
            "{api}/channel/subscribe/breaking?token={TOKEN}&user=chan-user"
        ))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // Membership is mirrored to the directory
    tokio::time::sleep(Duration::from_millis(200)).await;
    let info: Value = client
        .get(format!("{api}/info?token={TOKEN}&user=chan-user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let channels = info["connections"][0]["channels"].as_array().unwrap();
    assert!(channels.iter().any(|c| c == "breaking"));

    let response = client
        .post(format!(
            "{api}/send?token={TOKEN}&channel=breaking&type=text"
        ))
        .body("channel message")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("frame within deadline")
        .unwrap()
        .unwrap();
    assert_eq!(frame, Message::Text("channel message".into()));

    // After unsubscribing, channel sends no longer match
    client
        .post(format!(
            "{api}/channel/unsubscribe/breaking?token={TOKEN}&user=chan-user"
        ))
        .send()
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    client
        .post(format!(
            "{api}/send?token={TOKEN}&channel=breaking&type=text"
        ))
        .body("after unsubscribe")
        .send()
        .await
        .unwrap();
    assert!(
        tokio::time::timeout(Duration::from_millis(500), socket.next())
            .await
            .is_err()
    );
}

#[tokio::test]
#[ignore = "requires a running Redis at localhost:6379"]
async fn disconnect_closes_socket_and_burns_claims() {
    let config = test_config();
    let api = start_api(config.clone()).await;
    let (worker, _state) = start_worker(config).await;
    let client = reqwest::Client::new();

    let body = mint_claim(&client, &api, "user=dc-user").await;
    let claim_id = body["claim"]["id"].as_str().unwrap();

    let (mut socket, _) =
        tokio_tungstenite::connect_async(format!("ws://{worker}/connect?claim={claim_id}"))
            .await
            .unwrap();

    // A pending claim the user has not used yet
    mint_claim(&client, &api, "user=dc-user&duration=600").await;

    let response = client
        .post(format!("{api}/disconnect?token={TOKEN}&user=dc-user"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // The server closes the socket
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break,
            }
        }
    })
    .await;
    assert!(closed.is_ok());

    // The pending claim is gone too
    tokio::time::sleep(Duration::from_millis(200)).await;
    let info: Value = client
        .get(format!("{api}/info?token={TOKEN}&user=dc-user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(info["claims"].as_array().unwrap().is_empty());
}
