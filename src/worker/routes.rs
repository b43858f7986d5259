//! Worker router: the public connect endpoint plus, in direct mode, the
//! internal receive endpoints the control plane pushes to.

use axum::middleware;
use axum::routing::{any, get, post};
use axum::Router;

use crate::config::MessagingMethod;
use crate::http::{ping_handler, request_id_middleware};
use crate::worker::{connection, deliver, WorkerState};

pub fn build_router(state: WorkerState) -> Router {
    let mut router = Router::new()
        .route("/connect", get(connection::connect_handler))
        .route("/ping", any(ping_handler));

    if state.config.messaging() == MessagingMethod::Direct {
        router = router
            .route("/_/message", post(deliver::receive_message_handler))
            .route(
                "/_/message/channel",
                post(deliver::receive_channel_action_handler),
            );
    }

    router
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
