//! Minact server - main entry point
//!
//! Starts the meeting-notes-to-task-tracker HTTP service: resolves the
//! root folder, initializes the SQLite store, wires the Gemini transcript
//! analyzer and spawns the background SLA sweeper before serving.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;

use minact_server::{build_router, extractor::GeminiAnalyzer, sweeper, AppState};

/// Command-line arguments for minact-server
#[derive(Parser, Debug)]
#[command(name = "minact-server")]
#[command(about = "Meeting minutes to action items - tracker service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5800", env = "MINACT_PORT")]
    port: u16,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minact_server=info,tower_http=info".into()),
        )
        .init();

    info!("Starting Minact server v{}", env!("CARGO_PKG_VERSION"));

    // Parse command-line arguments
    let args = Args::parse();

    let root_folder =
        minact_common::config::resolve_root_folder(args.root_folder.as_deref(), "MINACT_ROOT_FOLDER");
    minact_common::config::ensure_root_folder(&root_folder)
        .context("Failed to create root folder")?;

    let db_path = minact_common::config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = minact_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    // Transcript analyzer (requires GEMINI_API_KEY)
    let analyzer = GeminiAnalyzer::from_env().context("Failed to configure transcript analyzer")?;
    info!("Transcript analyzer ready (model: {})", analyzer.model_name());

    let state = AppState::new(pool.clone(), Arc::new(analyzer));
    let app = build_router(state);

    // Background SLA sweeper
    let sweeper_config = sweeper::SweeperConfig::from_database(&pool).await;
    sweeper::spawn(pool, sweeper_config);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("minact-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
