//! Socket lifecycle: admission, the per-connection tasks, and teardown.
//!
//! Each socket runs three tasks. The reader (this task) owns the receive
//! half and liveness bookkeeping; a writer task owns the send half and
//! drains the connection's mailbox; a ping task emits protocol pings on the
//! liveness interval. A shared cancellation token closes all three.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::store::ConnectionRecord;
use crate::worker::auth::{self, Identity};
use crate::worker::registry::Connection;
use crate::worker::WorkerState;

#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    #[serde(default)]
    pub claim: String,
    #[serde(default)]
    pub jwt: String,
}

/// `GET /connect`: authenticate, then upgrade. Authentication happens
/// before the upgrade so rejections carry a readable error body instead of
/// a dropped socket.
pub async fn connect_handler(
    State(state): State<WorkerState>,
    Query(query): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match auth::authenticate(&state.config, &state.store, &query.claim, &query.jwt).await {
        Ok(identity) => ws.on_upgrade(move |socket| run_connection(state, socket, identity)),
        Err(error) => error.into_response(),
    }
}

async fn run_connection(state: WorkerState, socket: WebSocket, identity: Identity) {
    let id = Uuid::new_v4().to_string();
    let (sender, mut mailbox) = mpsc::unbounded_channel();

    let connection = Arc::new(Connection::new(
        id.clone(),
        identity.user.clone(),
        identity.session.clone(),
        identity.channels.clone(),
        sender,
    ));

    let record = ConnectionRecord {
        id: id.clone(),
        user: identity.user,
        worker_id: state.worker_id.clone(),
        session: identity.session,
        channels: identity.channels,
        last_ping: Utc::now(),
    };

    state.registry.add(connection.clone());
    if let Err(error) = state
        .store
        .admit_connection(&record, state.record_ttl_seconds())
        .await
    {
        tracing::error!(connection_id = %id, error = %error, "failed to mirror connection");
        state.registry.remove(&id);
        return;
    }

    tracing::info!(
        connection_id = %id,
        user = %record.user,
        session = record.session.as_deref().unwrap_or(""),
        "connection admitted"
    );

    let (mut sink, mut stream) = socket.split();
    let close = connection.close_signal();

    let writer_close = close.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = mailbox.recv() => {
                    let Some(frame) = frame else { break };
                    if sink.send(frame).await.is_err() {
                        break;
                    }
                }
                _ = writer_close.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    // Give the close frame a moment to flush before the
                    // transport drops
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    break;
                }
            }
        }
    });

    let ping_connection = connection.clone();
    let ping_close = close.clone();
    let ping_interval = Duration::from_secs(state.config.ttl_seconds);
    let pinger = tokio::spawn(async move {
        let mut interval = tokio::time::interval(ping_interval);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !ping_connection.send(Message::Ping(Vec::new().into())) {
                        break;
                    }
                }
                _ = ping_close.cancelled() => break,
            }
        }
    });

    // Reader loop: liveness signals refresh both the local handle and the
    // store record; anything else from the client is ignored (delivery is
    // one-way, backend to client).
    loop {
        tokio::select! {
            _ = close.cancelled() => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    connection.touch();
                    if let Err(error) = state
                        .store
                        .touch_connection(&id, Utc::now(), state.record_ttl_seconds())
                        .await
                    {
                        tracing::warn!(connection_id = %id, error = %error, "failed to refresh liveness");
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::debug!(connection_id = %id, error = %error, "socket error");
                    break;
                }
            },
        }
    }

    connection.close();
    let _ = writer.await;
    pinger.abort();

    state.registry.remove(&id);
    // The channel set may have changed since admission
    if let Err(error) = state
        .store
        .remove_connection(&record, &connection.channels())
        .await
    {
        tracing::error!(connection_id = %id, error = %error, "failed to remove connection record");
    }

    tracing::info!(connection_id = %id, "connection closed");
}
