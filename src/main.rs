//! Shelfscan Server
//!
//! Accepts a photo of a stack of books, cuts it into spines, reads each spine
//! and looks the text up as a book title.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfscan_server::config::Config;
use shelfscan_server::pipeline::Pipeline;
use shelfscan_server::routes;
use shelfscan_server::session::SessionStore;
use shelfscan_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "shelfscan_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // The cropper runs inside each session directory, so it needs an absolute path
    config.pipeline.segmenter_bin = std::fs::canonicalize(&config.pipeline.segmenter_bin)
        .context("Failed to resolve segmentation binary path")?;

    tracing::info!("Starting Shelfscan Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Spine cropper: {}", config.pipeline.segmenter_bin.display());
    tracing::info!("Tesseract: {}", config.pipeline.recognizer_bin.display());
    tracing::info!("Sessions directory: {}", config.pipeline.sessions_dir.display());

    let sessions = SessionStore::open(&config.pipeline.sessions_dir)
        .await
        .context("Failed to open sessions directory")?;

    let pipeline = Pipeline::from_config(&config, sessions)
        .context("Failed to initialize title search client")?;

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    let addr: SocketAddr = listener.local_addr()?;

    let app = routes::app(AppState::new(config, pipeline));

    tracing::info!("Shelfscan Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
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
