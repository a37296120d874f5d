//! Handler for link statistics.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::stats::StatsResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns the merged click count and metadata for a short link.
///
/// # Endpoint
///
/// `GET /api/urls/{code}/stats`
///
/// Expired links still report statistics.
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.resolver.stats(&code).await?;
    Ok(Json(stats.into()))
}
