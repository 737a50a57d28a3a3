//! Axum router construction.
//!
//! Builds the full application router with all routes, middleware layers and
//! optional static UI serving.

use std::path::PathBuf;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Ingest and delivery
        .route("/upload", post(routes::upload::upload_video))
        .route("/stream", get(routes::media::stream_file))
        .route("/download", get(routes::media::download_file))
        .route("/proxy", get(routes::proxy::proxy_stream))
        // Processing
        .route("/process", post(routes::process::process_vr180))
        .route("/process_anaglyph", post(routes::process::process_anaglyph))
        .route("/jobs", get(routes::jobs::list_jobs))
        // HLS
        .route("/hls_manifest", get(routes::hls::hls_manifest))
        .route("/hls_refresh", get(routes::hls::hls_refresh))
        .route("/stream_status", get(routes::hls::stream_status))
        .route("/hls/{*path}", get(routes::hls::serve_incremental))
        .route("/hls_final/{*path}", get(routes::hls::serve_final))
        // Source videos can be many gigabytes.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Static file serving for UI build.
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                tower_http::services::ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(tower_http::services::ServeFile::new(index_path)),
            );
        }
    }

    app
}
