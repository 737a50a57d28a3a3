//! Processing triggers for both conversion modes.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use vrs_core::ingest::NamingPolicy;
use vrs_core::Mode;

use crate::context::AppContext;
use crate::dispatcher::InputRef;
use crate::error::AppError;
use crate::routes::upload::FILE_FIELD;

#[derive(Debug, Deserialize)]
pub struct ProcessParams {
    pub filename: Option<String>,
    #[serde(default = "default_add_audio")]
    pub add_audio: bool,
}

fn default_add_audio() -> bool {
    true
}

/// POST /process
pub async fn process_vr180(
    State(ctx): State<AppContext>,
    query: Result<Query<ProcessParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    process(ctx, Mode::Vr180, query, multipart).await
}

/// POST /process_anaglyph
pub async fn process_anaglyph(
    State(ctx): State<AppContext>,
    query: Result<Query<ProcessParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    process(ctx, Mode::Anaglyph, query, multipart).await
}

/// An inline upload wins over a `filename` reference. Empty file parts and
/// bodies that aren't multipart at all count as "no upload".
async fn process(
    ctx: AppContext,
    mode: Mode,
    query: Result<Query<ProcessParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = query?;
    ctx.layout.ensure_roots()?;

    let mut input = None;
    if let Ok(mut multipart) = multipart {
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            let Some(original) = field
                .file_name()
                .filter(|n| !n.trim().is_empty())
                .map(str::to_owned)
            else {
                tracing::debug!("Ignoring empty file part");
                break;
            };

            let stored = ctx.ingest.store(&original, NamingPolicy::Exact, field).await?;
            input = Some(InputRef::Uploaded(stored));
            break;
        }
    }

    if input.is_none() {
        input = params
            .filename
            .filter(|f| !f.trim().is_empty())
            .map(InputRef::Existing);
    }

    let accepted = ctx.dispatcher.dispatch(mode, input, params.add_audio)?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}
