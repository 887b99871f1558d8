use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use wardrobe_pipeline::PipelineConfig;
use wardrobe_worker::{telemetry, Collaborators, RunDispatcher, RunLauncher, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("wardrobe_worker=debug,wardrobe_pipeline=debug,wardrobe_providers=info");

    // The worker only claims runs from the shared database.
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let config = WorkerConfig::from_env();
    let pipeline_config = PipelineConfig::from_env();

    let collaborators = Collaborators::from_env()
        .await
        .expect("Failed to initialise collaborators");
    let driver = collaborators
        .build_driver(&pipeline_config)
        .expect("Failed to build pipeline");
    let launcher = RunLauncher::new(Arc::new(driver));

    let dispatcher = RunDispatcher::new(
        Arc::clone(&collaborators.store),
        launcher.clone(),
        &config,
    );
    let cancel = CancellationToken::new();
    let dispatcher_cancel = cancel.clone();
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_cancel).await;
    });

    shutdown_signal().await;

    cancel.cancel();
    let _ = dispatcher_handle.await;

    if launcher.shutdown(config.shutdown_timeout).await {
        tracing::info!("Worker stopped");
    } else {
        tracing::warn!(
            remaining = launcher.in_flight(),
            "Shutdown timeout elapsed with runs still in flight",
        );
    }
}

/// Wait for SIGINT or (on Unix) SIGTERM.
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
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
