//! API route configuration.

use crate::api::handlers::{create_url_handler, reconcile_handler, stats_handler, sweep_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// All API routes.
///
/// # Endpoints
///
/// - `POST /urls`                - Create a short link
/// - `GET  /urls/{code}/stats`   - Merged click statistics for a link
/// - `POST /reconcile`           - Flush cached click counters now
/// - `POST /sweep`               - Expire old mappings now
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/urls", post(create_url_handler))
        .route("/urls/{code}/stats", get(stats_handler))
        .route("/reconcile", post(reconcile_handler))
        .route("/sweep", post(sweep_handler))
}
