use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: String,
}

/// GET /proxy?url=
pub async fn proxy_stream(
    State(ctx): State<AppContext>,
    query: Result<Query<ProxyParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = query?;
    Ok(ctx.proxy.open(&params.url).await?)
}
