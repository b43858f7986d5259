//! Pub/sub relay: the worker's subscriptions to its own delivery channels.
//!
//! Two dedicated subscriber connections, one per payload kind, so decoding
//! never has to sniff the payload. Undecodable payloads are logged and
//! dropped; the loops only end on shutdown or a lost subscriber connection.

use prost::Message as _;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::proto;
use crate::store::keys;
use crate::worker::{deliver, WorkerState};

/// Spawn the two subscriber loops for this worker. Returns their handles;
/// cancelling `shutdown` ends both.
pub async fn spawn_subscribers(
    state: WorkerState,
    shutdown: CancellationToken,
) -> Result<Vec<JoinHandle<()>>, crate::store::StoreError> {
    let messages = state
        .store
        .subscriber(&keys::worker_messages(&state.worker_id))
        .await?;
    let channel_actions = state
        .store
        .subscriber(&keys::worker_channel_actions(&state.worker_id))
        .await?;

    let message_state = state.clone();
    let message_shutdown = shutdown.clone();
    let message_loop = tokio::spawn(async move {
        run_loop(messages, message_shutdown, |payload| {
            let state = message_state.clone();
            async move {
                match proto::Message::decode(payload.as_slice()) {
                    Ok(message) => deliver::handle_message(&state, &message).await,
                    Err(error) => {
                        tracing::warn!(error = %error, "dropping undecodable message payload");
                    }
                }
            }
        })
        .await;
    });

    let action_state = state;
    let action_loop = tokio::spawn(async move {
        run_loop(channel_actions, shutdown, |payload| {
            let state = action_state.clone();
            async move {
                match proto::ChannelAction::decode(payload.as_slice()) {
                    Ok(action) => deliver::handle_channel_action(&state, &action).await,
                    Err(error) => {
                        tracing::warn!(error = %error, "dropping undecodable channel action payload");
                    }
                }
            }
        })
        .await;
    });

    Ok(vec![message_loop, action_loop])
}

async fn run_loop<F, Fut>(mut pubsub: redis::aio::PubSub, shutdown: CancellationToken, handle: F)
where
    F: Fn(Vec<u8>) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    use futures_util::StreamExt;

    let mut stream = pubsub.on_message();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            message = stream.next() => {
                let Some(message) = message else {
                    tracing::error!("pub/sub subscriber connection lost");
                    break;
                };
                match message.get_payload::<Vec<u8>>() {
                    Ok(payload) => handle(payload).await,
                    Err(error) => {
                        tracing::warn!(error = %error, "dropping unreadable pub/sub payload");
                    }
                }
            }
        }
    }
}
