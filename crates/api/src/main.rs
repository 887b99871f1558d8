use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use wardrobe_api::config::ServerConfig;
use wardrobe_api::router::build_app_router;
use wardrobe_api::state::AppState;
use wardrobe_pipeline::PipelineConfig;
use wardrobe_worker::{telemetry, Collaborators, RunLauncher};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    telemetry::init_tracing("wardrobe_api=debug,wardrobe_pipeline=debug,tower_http=debug");

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        inline_execution = config.inline_execution,
        "Loaded server configuration",
    );

    // --- Collaborators ---
    let collaborators = Collaborators::from_env()
        .await
        .expect("Failed to initialise collaborators");

    // --- Run execution ---
    let launcher = if config.inline_execution {
        let driver = collaborators
            .build_driver(&PipelineConfig::from_env())
            .expect("Failed to build pipeline");
        Some(RunLauncher::new(Arc::new(driver)))
    } else {
        assert!(
            collaborators.pool.is_some(),
            "INLINE_EXECUTION=false requires DATABASE_URL so a worker can claim runs",
        );
        tracing::info!("Inline execution disabled, runs are left for wardrobe-worker");
        None
    };

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        pool: collaborators.pool.clone(),
        store: Arc::clone(&collaborators.store),
        tracker: Arc::clone(&collaborators.tracker),
        storage: Arc::clone(&collaborators.storage),
        launcher: launcher.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    if let Some(launcher) = launcher {
        let timeout = Duration::from_secs(config.shutdown_timeout_secs);
        if !launcher.shutdown(timeout).await {
            tracing::warn!(
                remaining = launcher.in_flight(),
                "Shutdown timeout elapsed with runs still in flight",
            );
        }
    }
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
