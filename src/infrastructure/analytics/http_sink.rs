//! HTTP analytics sink.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::analytics::{AnalyticsError, AnalyticsSink};
use crate::domain::click_event::ClickEvent;

/// Posts click events as JSON to `{base_url}/events/click`.
pub struct HttpAnalyticsSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyticsSink {
    /// Creates a sink for the analytics service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AnalyticsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalyticsError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: events_endpoint(base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn events_endpoint(base_url: &str) -> String {
    format!("{}/events/click", base_url.trim_end_matches('/'))
}

#[async_trait]
impl AnalyticsSink for HttpAnalyticsSink {
    async fn emit(&self, event: &ClickEvent) -> Result<(), AnalyticsError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&event.payload())
            .send()
            .await
            .map_err(|e| AnalyticsError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_endpoint() {
        assert_eq!(
            events_endpoint("http://analytics:8001"),
            "http://analytics:8001/events/click"
        );
        assert_eq!(
            events_endpoint("http://analytics:8001/"),
            "http://analytics:8001/events/click"
        );
    }

    #[test]
    fn test_new_sets_endpoint() {
        let sink = HttpAnalyticsSink::new("http://localhost:8001", Duration::from_secs(2)).unwrap();
        assert_eq!(sink.endpoint(), "http://localhost:8001/events/click");
    }
}
