//! Client for triggering reconciliation on a running instance.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::application::services::ReconcileReport;
use crate::error::AppError;

/// Response body of `POST /api/reconcile`.
#[derive(Debug, Deserialize)]
pub struct RemoteReconcileResponse {
    pub status: String,
    pub report: ReconcileReport,
}

/// Posts to `{api_url}/api/reconcile`.
pub struct RemoteReconcileClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteReconcileClient {
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the HTTP client cannot be built.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::internal("Failed to build HTTP client", json!({ "reason": e.to_string() }))
            })?;

        Ok(Self {
            client,
            endpoint: reconcile_endpoint(api_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one trigger request.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the instance is unreachable, answers
    /// with an error status, or reports counters it could not flush.
    pub async fn trigger(&self) -> Result<ReconcileReport, AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .send()
            .await
            .map_err(|e| {
                AppError::store_unavailable(
                    "Reconciliation endpoint unreachable",
                    json!({ "endpoint": self.endpoint, "reason": e.to_string() }),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::store_unavailable(
                "Reconciliation endpoint returned an error",
                json!({ "status": status.as_u16(), "body": body }),
            ));
        }

        let body: RemoteReconcileResponse = response.json().await.map_err(|e| {
            AppError::internal(
                "Unexpected reconciliation response",
                json!({ "reason": e.to_string() }),
            )
        })?;

        into_report(body)
    }
}

/// Accepts a report only if every counter was flushed.
fn into_report(body: RemoteReconcileResponse) -> Result<ReconcileReport, AppError> {
    if body.report.failed > 0 {
        return Err(AppError::store_unavailable(
            "Some click counters could not be reconciled",
            json!({ "failed": body.report.failed, "flushed": body.report.flushed }),
        ));
    }

    Ok(body.report)
}

fn reconcile_endpoint(api_url: &str) -> String {
    format!("{}/api/reconcile", api_url.trim_end_matches('/'))
}
