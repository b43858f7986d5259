//! Control plane: claim minting, target resolution, dispatch to workers,
//! and the info endpoint. Consumed by upstream backend services.

pub mod channels;
pub mod claims;
pub mod disconnect;
pub mod dispatch;
pub mod info;
pub mod resolve;
pub mod routes;
pub mod send;

use std::sync::Arc;

use crate::config::Config;
use crate::store::DirectoryStore;

/// Shared control-plane state passed to all handlers via axum's State
/// extractor.
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub store: DirectoryStore,
    /// HTTP client for direct-mode delivery to workers.
    pub http: reqwest::Client,
}

impl ApiState {
    pub fn new(config: Arc<Config>, store: DirectoryStore) -> Self {
        Self {
            config,
            store,
            http: reqwest::Client::new(),
        }
    }
}
