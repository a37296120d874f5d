//! Handler for short URL redirect.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect},
};
use std::net::SocketAddr;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::request_meta::click_context_from_headers;

/// Redirects a short code to its target URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Build the click context (client IP, User-Agent, Referer, country)
/// 2. Resolve through [`crate::application::services::ResolverService::resolve`],
///    which counts the click and queues the analytics event
/// 3. Return 307 Temporary Redirect
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
/// Returns 410 Gone if the link has expired.
/// Returns 503 Service Unavailable if the store is unreachable on a cache miss.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, AppError> {
    let context = click_context_from_headers(&headers, Some(addr), state.behind_proxy);

    let target_url = state.resolver.resolve(&code, context).await?;

    Ok(Redirect::temporary(&target_url))
}
