//! Liveness refresher: keeps this worker's store records from expiring.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::worker::WorkerState;

/// Refresh the worker record and every owned connection record each
/// liveness period. Missing a tick is tolerated by the TTL buffer; records
/// only expire once the worker is actually gone.
pub async fn run_ttl_refresher(state: WorkerState, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(state.config.ttl_seconds));
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                let connection_ids = state.registry.connection_ids();
                if let Err(error) = state
                    .store
                    .refresh_ttls(&state.worker_id, &connection_ids, state.record_ttl_seconds())
                    .await
                {
                    tracing::warn!(error = %error, "failed to refresh record liveness");
                } else {
                    tracing::trace!(connections = connection_ids.len(), "refreshed record liveness");
                }
            }
        }
    }
}
