use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use sockgate::config::{generate_config_template, Config, MessagingMethod};
use sockgate::store::DirectoryStore;
use sockgate::worker::{relay, routes, ttl, WorkerState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "sockgate=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "sockgate=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("sockgate worker v{} starting", env!("CARGO_PKG_VERSION"));

    let store = DirectoryStore::open(&config.redis_url)?;
    store.ping().await?;

    let config = Arc::new(config);
    let state = WorkerState::new(config.clone(), store.clone());
    tracing::info!(worker_id = %state.worker_id, "worker id assigned");

    // Direct mode advertises a reachable address; redis mode only needs
    // the pub/sub subscriptions
    let direct = config.messaging() == MessagingMethod::Direct;
    let address = direct.then(|| config.direct_address());
    store
        .register_worker(
            &state.worker_id,
            address.as_deref(),
            state.record_ttl_seconds(),
        )
        .await?;

    let shutdown = CancellationToken::new();

    let mut subscriber_handles = Vec::new();
    if !direct {
        subscriber_handles = relay::spawn_subscribers(state.clone(), shutdown.clone()).await?;
    }

    let refresher = tokio::spawn(ttl::run_ttl_refresher(state.clone(), shutdown.clone()));

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_shutdown.cancel();
        }
    });

    let app = routes::build_router(state.clone());

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    let serve_shutdown = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
    .await?;

    // Teardown: close every socket, stop the background tasks, and drop
    // this worker from the directory
    tracing::info!(connections = state.registry.len(), "closing connections");
    for connection in state.registry.all() {
        connection.close();
    }

    shutdown.cancel();
    for handle in subscriber_handles {
        let _ = handle.await;
    }
    let _ = refresher.await;

    store.deregister_worker(&state.worker_id).await?;
    tracing::info!("worker deregistered");

    Ok(())
}
