//! Handlers triggering the background jobs on demand.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::jobs::JobResponse;
use crate::application::services::{ReconcileReport, SweepReport};
use crate::error::AppError;
use crate::state::AppState;

/// Runs a reconciliation now.
///
/// # Endpoint
///
/// `POST /api/reconcile`
///
/// Idempotent: with no new clicks a second call flushes nothing. If a run is
/// already in progress, responds with `"status": "skipped"`.
///
/// # Errors
///
/// Returns 503 Service Unavailable if the pending counters cannot be listed.
pub async fn reconcile_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<JobResponse<ReconcileReport>>), AppError> {
    let report = state.reconciler.run().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(JobResponse::new(report.skipped, report)),
    ))
}

/// Runs an expiry sweep now.
///
/// # Endpoint
///
/// `POST /api/sweep`
///
/// # Errors
///
/// Returns 503 Service Unavailable if the store fails mid-sweep.
pub async fn sweep_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<JobResponse<SweepReport>>), AppError> {
    let report = state.sweeper.run().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(JobResponse::new(report.skipped, report)),
    ))
}
