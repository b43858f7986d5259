//! Delivery of encoded payloads from the control plane to workers.
//!
//! Two transports, selected by config: redis pub/sub (publish to each
//! worker's channel) and direct mode (HTTP POST to each worker's advertised
//! address). Both attempt every worker before reporting failure, so one dead
//! worker never shadows deliveries to the rest.

use futures_util::future::join_all;
use prost::Message as _;

use crate::api::ApiState;
use crate::config::MessagingMethod;
use crate::error::{ApiError, ErrorCode};
use crate::http::RequestId;
use crate::proto::{self, PROTOBUF_CONTENT_TYPE, REQUEST_ID_HEADER};

/// What is being dispatched; selects the pub/sub channel or HTTP path the
/// worker listens on.
#[derive(Debug, Clone, Copy)]
pub enum PayloadKind {
    Message,
    ChannelAction,
}

impl PayloadKind {
    fn is_channel_action(self) -> bool {
        matches!(self, PayloadKind::ChannelAction)
    }

    /// Direct-mode receive path on the worker.
    fn receive_path(self) -> &'static str {
        match self {
            PayloadKind::Message => "/_/message",
            PayloadKind::ChannelAction => "/_/message/channel",
        }
    }
}

pub fn encode_message(message: &proto::Message) -> Result<Vec<u8>, ApiError> {
    let mut buf = Vec::with_capacity(message.encoded_len());
    message
        .encode(&mut buf)
        .map_err(|e| ApiError::internal(ErrorCode::MarshallingMessage, e))?;
    Ok(buf)
}

pub fn encode_channel_action(action: &proto::ChannelAction) -> Result<Vec<u8>, ApiError> {
    let mut buf = Vec::with_capacity(action.encoded_len());
    action
        .encode(&mut buf)
        .map_err(|e| ApiError::internal(ErrorCode::MarshallingMessage, e))?;
    Ok(buf)
}

/// Push an encoded payload to every named worker over the configured
/// transport. An empty worker list is a no-op success (the target simply
/// matched nothing).
pub async fn send_to_workers(
    state: &ApiState,
    request_id: &RequestId,
    worker_ids: &[String],
    kind: PayloadKind,
    payload: &[u8],
) -> Result<(), ApiError> {
    if worker_ids.is_empty() {
        return Ok(());
    }

    match state.config.messaging() {
        MessagingMethod::Redis => {
            state
                .store
                .publish_to_workers(worker_ids, kind.is_channel_action(), payload)
                .await
                .map_err(|e| ApiError::internal(ErrorCode::DeliveringMessage, e))?;
            Ok(())
        }
        MessagingMethod::Direct => {
            send_direct(state, request_id, worker_ids, kind, payload).await
        }
    }
}

/// Direct mode: resolve each worker's advertised address and POST the
/// payload. Workers missing from the store (expired registration) or
/// registered without an address are skipped with a warning; transport
/// failures are collected and reported after every delivery was attempted.
async fn send_direct(
    state: &ApiState,
    request_id: &RequestId,
    worker_ids: &[String],
    kind: PayloadKind,
    payload: &[u8],
) -> Result<(), ApiError> {
    let workers = state
        .store
        .get_workers(worker_ids)
        .await
        .map_err(|e| ApiError::internal(ErrorCode::ReachingWorker, e))?;

    let mut requests = Vec::new();
    for (worker_id, worker) in worker_ids.iter().zip(workers) {
        let Some(worker) = worker else {
            tracing::warn!(worker_id = %worker_id, "skipping worker with expired registration");
            continue;
        };
        let Some(address) = worker.address else {
            tracing::warn!(worker_id = %worker_id, "skipping worker with no advertised address");
            continue;
        };

        let url = format!("http://{}{}", address, kind.receive_path());
        let request = state
            .http
            .post(url)
            .header("Content-Type", PROTOBUF_CONTENT_TYPE)
            .header(REQUEST_ID_HEADER, request_id.0.clone())
            .body(payload.to_vec())
            .send();
        requests.push((worker.id, request));
    }

    let (ids, futures): (Vec<_>, Vec<_>) = requests.into_iter().unzip();
    let responses = join_all(futures).await;

    let mut failures = Vec::new();
    for (worker_id, response) in ids.into_iter().zip(responses) {
        match response {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::error!(
                    worker_id = %worker_id,
                    status = %response.status(),
                    "worker rejected delivery"
                );
                failures.push(worker_id);
            }
            Err(error) => {
                tracing::error!(worker_id = %worker_id, error = %error, "worker unreachable");
                failures.push(worker_id);
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(
            ApiError::new(ErrorCode::DeliveringMessage, axum::http::StatusCode::INTERNAL_SERVER_ERROR)
                .with_message(format!(
                    "Error delivering message to {} worker(s)",
                    failures.len()
                )),
        )
    }
}
