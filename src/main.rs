//! Media Server
//!
//! Accepts image and video uploads, screens and compresses images, and keeps
//! a per-user content index so the same image is never stored twice.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_server::config::Config;
use media_server::routes;
use media_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "media_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Media Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Images directory: {}", config.storage.images_dir.display());
    tracing::info!("Videos directory: {}", config.storage.videos_dir.display());
    tracing::info!("Public base URL: {}", config.server.base_url);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;

    let app_state = AppState::new(config);

    match app_state
        .storage()
        .cleanup_stale_files(app_state.hash_index())
        .await
    {
        Ok(0) => {}
        Ok(removed) => tracing::info!("Removed {} stale temp files", removed),
        Err(e) => tracing::warn!("Stale file cleanup failed: {}", e),
    }

    let app = routes::app(app_state);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Media Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
