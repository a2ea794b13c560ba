//! Control-plane endpoints: scheduler, worker, maintenance, monitor.

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;

use super::ApiError;
use crate::kernel::batches::{maintenance, Monitor, Worker};
use crate::server::app::AppState;

/// One scheduler tick: evaluate the cron table for the current minute and
/// fire matching targets.
pub async fn scheduler_handler(
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    let tick = state.scheduler.tick(Utc::now()).await;
    Ok(Json(tick).into_response())
}

/// One worker tick over all batch types.
///
/// A tick that cannot reach the store reports `{claimed: 0, error}`; the
/// next scheduled tick is the retry.
pub async fn worker_handler(Extension(state): Extension<AppState>) -> Response {
    let worker = Worker::new(state.deps.clone(), state.registry.clone());
    match worker.tick().await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "claimed": 0, "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// One maintenance invocation: lease recovery, DLQ requeue, cleanup.
pub async fn maintenance_handler(
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    let summary = maintenance::run(&state.deps.db_pool).await?;
    Ok(Json(summary).into_response())
}

/// One monitor invocation: health report plus any auto-remediation taken.
pub async fn monitor_handler(
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    let monitor = Monitor::new(state.deps.db_pool.clone(), state.alert_sink.clone());
    let report = monitor.run().await?;
    Ok(Json(report).into_response())
}
