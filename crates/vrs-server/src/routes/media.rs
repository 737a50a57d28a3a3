//! Local media delivery: range streaming and attachment downloads.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use serde::Deserialize;

use vrs_core::media::canonical_media_name;
use vrs_core::storage::sanitize_file_name;

use crate::context::AppContext;
use crate::error::AppError;
use crate::streaming_helpers;

#[derive(Debug, Deserialize)]
pub struct FileParams {
    pub filename: String,
}

/// GET /stream?filename=
///
/// Looks in the output root, then the ingest root. Honors a single
/// `Range` header.
pub async fn stream_file(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    query: Result<Query<FileParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = query?;
    let base = sanitize_file_name(&params.filename)?;
    let path = ctx.layout.resolve_media(canonical_media_name(&base))?;

    // A header that isn't valid ASCII can't match the range grammar.
    let range = headers
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default());

    Ok(streaming_helpers::serve_file(&path, range).await?)
}

/// GET /download?filename=
pub async fn download_file(
    State(ctx): State<AppContext>,
    query: Result<Query<FileParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = query?;
    let path = ctx.layout.resolve_media(&params.filename)?;
    Ok(streaming_helpers::serve_attachment(&path).await?)
}
