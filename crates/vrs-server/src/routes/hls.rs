//! HLS discovery endpoints and static serving of mounted directories.

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::Uri;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use vrs_core::{Error, Mode};

use crate::context::AppContext;
use crate::error::AppError;
use crate::mounts::{HLS_FINAL_PREFIX, HLS_PREFIX};
use crate::publisher::{ManifestStatus, RefreshReport};
use crate::status::{self, StreamStatus};

/// GET /hls_manifest
pub async fn hls_manifest(State(ctx): State<AppContext>) -> Json<ManifestStatus> {
    Json(ctx.publisher.manifest_status())
}

/// GET /hls_refresh
pub async fn hls_refresh(State(ctx): State<AppContext>) -> Json<RefreshReport> {
    Json(ctx.publisher.refresh())
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub mode: Option<String>,
}

/// GET /stream_status?mode=vr180|anaglyph
pub async fn stream_status(
    State(ctx): State<AppContext>,
    query: Result<Query<StatusParams>, QueryRejection>,
) -> Result<Json<StreamStatus>, AppError> {
    let Query(params) = query?;
    let mode = match params.mode.as_deref() {
        None | Some("") => Mode::default(),
        Some(raw) => raw.parse()?,
    };
    Ok(Json(status::stream_status(&ctx.layout, &ctx.publisher, mode)?))
}

/// GET /hls/{*path}
pub async fn serve_incremental(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    serve_mounted(&ctx, HLS_PREFIX, &path, request).await
}

/// GET /hls_final/{*path}
pub async fn serve_final(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    serve_mounted(&ctx, HLS_FINAL_PREFIX, &path, request).await
}

/// Serve `path` from the directory mounted at `prefix`.
async fn serve_mounted(
    ctx: &AppContext,
    prefix: &str,
    path: &str,
    request: Request,
) -> Result<Response, AppError> {
    if path.split(['/', '\\']).any(|c| c == "..") {
        return Err(Error::Validation("Invalid path".into()).into());
    }

    let dir = ctx
        .mounts
        .get(prefix)
        .ok_or_else(|| Error::not_found("mount", prefix))?;

    // ServeDir resolves the request path relative to its root, so drop the
    // public prefix while keeping the original percent-encoding.
    let (mut parts, body) = request.into_parts();
    let stripped = parts
        .uri
        .path()
        .strip_prefix(prefix)
        .filter(|p| p.starts_with('/'))
        .unwrap_or("/")
        .to_string();
    parts.uri = stripped
        .parse::<Uri>()
        .map_err(|e| Error::Validation(format!("Invalid path: {e}")))?;

    let response = ServeDir::new(dir)
        .oneshot(Request::from_parts(parts, body))
        .await
        .map_err(|e| Error::Internal(format!("Static file service failed: {e}")))?;
    Ok(response.map(Body::new))
}
