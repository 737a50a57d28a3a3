use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use vrs_core::ingest::NamingPolicy;
use vrs_core::Error;

use crate::context::AppContext;
use crate::error::AppError;

/// Multipart field carrying the video.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub path: String,
}

/// POST /upload
///
/// Stores the `file` part under a randomized name so that uploads of the
/// same original name never overwrite each other.
pub async fn upload_video(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    ctx.layout.ensure_roots()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original = field
            .file_name()
            .filter(|n| !n.trim().is_empty())
            .map(str::to_owned)
            .ok_or_else(|| Error::Validation("Filename missing".into()))?;

        let stored = ctx
            .ingest
            .store(&original, NamingPolicy::Randomized, field)
            .await?;

        return Ok(Json(UploadResponse {
            filename: stored.name,
            path: stored.path.to_string_lossy().into_owned(),
        }));
    }

    Err(Error::Validation("No file uploaded".into()).into())
}
