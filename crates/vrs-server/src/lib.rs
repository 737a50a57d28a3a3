//! vrs-server: HTTP API server and background job worker.
//!
//! This crate ties the vrs-core building blocks into a running server. It
//! provides:
//!
//! - Axum routes for ingest, range streaming, downloads and remote proxying
//! - Lazy discovery and mounting of HLS output directories
//! - A job dispatcher whose queue is drained by a bounded background worker
//! - Graceful shutdown via signal handling

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod mounts;
pub mod pipeline;
pub mod proxy;
pub mod publisher;
pub mod router;
pub mod routes;
pub mod status;
pub mod streaming_helpers;
pub mod tracker;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use vrs_core::config::Config;
use vrs_core::ProcessingJob;

use crate::context::AppContext;
use crate::pipeline::Pipeline;

/// Start the vrstream server.
///
/// Binds the configured address, then serves until a shutdown signal is
/// received.
pub async fn start(config: Config, pipeline: Arc<dyn Pipeline>) -> vrs_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| vrs_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let (ctx, queue) = AppContext::build(config)?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| vrs_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Starting server on {addr}");

    serve(listener, ctx, queue, pipeline, CancellationToken::new()).await
}

/// Run the HTTP server and job worker on an already-bound listener.
///
/// Returns once a shutdown signal arrives or `cancel` is triggered.
pub async fn serve(
    listener: TcpListener,
    ctx: AppContext,
    queue: mpsc::UnboundedReceiver<ProcessingJob>,
    pipeline: Arc<dyn Pipeline>,
    cancel: CancellationToken,
) -> vrs_core::Result<()> {
    ctx.layout.ensure_roots()?;
    tracing::info!(
        ingest = %ctx.layout.ingest_root.display(),
        output = %ctx.layout.output_root.display(),
        storage = %ctx.layout.storage_root.display(),
        "Storage roots ready"
    );

    // Attach whatever streaming directories already exist.
    let report = ctx.publisher.refresh();
    tracing::debug!(
        mounted = report.mounted,
        final_mounted = report.final_mounted,
        "Initial HLS discovery"
    );

    let worker = tokio::spawn(dispatcher::run_worker(
        queue,
        pipeline,
        Arc::clone(&ctx.jobs),
        ctx.config.pipeline.max_concurrent_jobs,
        cancel.clone(),
    ));

    let app = router::build_router(ctx.clone(), ctx.config.server.static_dir.clone());

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .map_err(|e| vrs_core::Error::Internal(format!("Server error: {e}")));

    // Stop the worker even when serving failed.
    cancel.cancel();
    let _ = worker.await;

    tracing::info!("Server shutdown complete");
    result
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
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
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
