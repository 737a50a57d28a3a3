//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`vrs_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on core results directly.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: vrs_core::Error,
}

impl AppError {
    pub fn new(inner: vrs_core::Error) -> Self {
        Self { inner }
    }
}

impl From<vrs_core::Error> for AppError {
    fn from(e: vrs_core::Error) -> Self {
        Self::new(e)
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(vrs_core::Error::Validation(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            let source = std::error::Error::source(&self.inner)
                .map(|s| s.to_string())
                .unwrap_or_default();
            tracing::error!(
                status = %status,
                error = %self.inner,
                source = %source,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
