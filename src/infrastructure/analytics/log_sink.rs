//! Tracing-only analytics sink.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::analytics::{AnalyticsError, AnalyticsSink};
use crate::domain::click_event::ClickEvent;

/// Sink used when `ANALYTICS_URL` is not configured.
pub struct LogAnalyticsSink;

#[async_trait]
impl AnalyticsSink for LogAnalyticsSink {
    async fn emit(&self, event: &ClickEvent) -> Result<(), AnalyticsError> {
        debug!(
            short_code = %event.short_code,
            referrer = ?event.referrer,
            user_agent = ?event.user_agent,
            country = ?event.country,
            "click"
        );
        Ok(())
    }
}
