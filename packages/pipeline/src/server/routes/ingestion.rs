//! Job-kind endpoints. Discovery runs inline; the process-* endpoints run
//! a worker tick restricted to their own batch type, so operators can
//! drain one kind without waiting for the general worker cadence.

use axum::extract::Extension;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ApiError;
use crate::domains::ingestion::{discover_artists, DiscoverArtistsPayload};
use crate::kernel::batches::Worker;
use crate::server::app::AppState;

/// Seed discovery: search artists (targeted or by genre seeds) and fan out
/// `album_page` batches.
pub async fn discover_artists_handler(
    Extension(state): Extension<AppState>,
    payload: Option<Json<DiscoverArtistsPayload>>,
) -> Result<Response, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let outcome = discover_artists::run(payload, &state.deps).await?;
    Ok(Json(outcome).into_response())
}

pub async fn process_album_page_handler(
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    tick_one_type(&state, "album_page").await
}

pub async fn process_track_page_handler(
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    tick_one_type(&state, "track_page").await
}

pub async fn identify_producers_handler(
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    tick_one_type(&state, "producer_discovery").await
}

async fn tick_one_type(state: &AppState, batch_type: &str) -> Result<Response, ApiError> {
    let worker = Worker::new(state.deps.clone(), state.registry.clone());
    let summary = worker.tick_for(Some(batch_type)).await?;
    Ok(Json(summary).into_response())
}
