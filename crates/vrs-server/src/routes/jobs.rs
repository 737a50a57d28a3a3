//! Job observability route.

use axum::extract::State;
use axum::Json;

use crate::context::AppContext;
use crate::tracker::JobRecord;

/// GET /jobs
///
/// Every dispatched job, most recently updated first.
pub async fn list_jobs(State(ctx): State<AppContext>) -> Json<Vec<JobRecord>> {
    Json(ctx.jobs.list())
}
