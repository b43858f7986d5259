//! Worker plane: socket admission, in-memory registry, delivery, and the
//! liveness refresher.

pub mod auth;
pub mod connection;
pub mod deliver;
pub mod registry;
pub mod relay;
pub mod routes;
pub mod ttl;

use std::sync::Arc;

use crate::config::{Config, TTL_BUFFER_SECONDS};
use crate::store::DirectoryStore;
use registry::ConnectionRegistry;

/// Shared worker state passed to all handlers and background tasks.
#[derive(Clone)]
pub struct WorkerState {
    /// Random id under which this worker registers and receives payloads.
    pub worker_id: String,
    pub config: Arc<Config>,
    pub store: DirectoryStore,
    pub registry: Arc<ConnectionRegistry>,
}

impl WorkerState {
    pub fn new(config: Arc<Config>, store: DirectoryStore) -> Self {
        Self {
            worker_id: uuid::Uuid::new_v4().to_string(),
            config,
            store,
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Store record TTL: the refresh period plus slack so records survive
    /// a late tick.
    pub fn record_ttl_seconds(&self) -> i64 {
        (self.config.ttl_seconds + TTL_BUFFER_SECONDS) as i64
    }
}
