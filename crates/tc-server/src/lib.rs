//! tc-server: HTTP API server for the trailcam catalog.
//!
//! - Axum routes for catalog queries, token issuance, and range streaming
//! - Pluggable bearer verification via [`auth::AuthGate`]
//! - Graceful shutdown via signal handling

pub mod auth;
pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;

use tc_catalog::CatalogStore;
use tc_core::config::Config;

use crate::context::AppContext;

/// Start the trailcam server.
///
/// Loads the catalog (failing fast if it cannot be read), builds the
/// [`AppContext`], and serves until a shutdown signal arrives.
pub async fn start(config: Config) -> tc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let store = CatalogStore::load(&config.catalog)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| tc_core::Error::Internal(format!("Invalid server address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| tc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    serve(listener, config, store).await
}

/// Serve on an already-bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    config: Config,
    store: CatalogStore,
) -> tc_core::Result<()> {
    let static_dir = config.server.static_dir.clone();
    let ctx = AppContext::new(config, store);
    let app = router::build_router(ctx, static_dir);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Starting server on {addr}");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
