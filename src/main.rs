//! Dataset Cache admin server
//!
//! Hosts a cache instance with its background tasks and exposes the admin
//! HTTP surface for statistics, invalidation and the runtime toggle.

use std::net::SocketAddr;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dataset_cache::api::{create_router, AppState};
use dataset_cache::cache::NoopChangeSource;
use dataset_cache::{spawn_cleanup_task, spawn_sync_task, Config};

/// Main entry point for the admin server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build and validate the cache
/// 4. Start background TTL cleanup and cross-context sync
/// 5. Serve the admin router on the configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dataset_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dataset Cache admin server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_memory_bytes={}, cleanup_interval={}s, port={}, enabled={}, cache_dir={:?}",
        config.max_memory_bytes,
        config.cleanup_interval,
        config.server_port,
        config.cache_enabled,
        config.cache_dir
    );

    // Invalid dataset policies or a cyclic dependency graph stop startup here
    let state = AppState::from_config(&config)?;
    info!("Cache initialized as {}", state.cache.context_id());

    let mut tasks = vec![spawn_cleanup_task(
        state.cache.clone(),
        config.cleanup_interval,
    )];
    // A standalone server has no sibling contexts to listen to
    tasks.extend(spawn_sync_task(state.cache.clone(), &NoopChangeSource));
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts the background tasks.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
