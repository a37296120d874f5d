//! Analytics emission contract.

use async_trait::async_trait;

use crate::domain::click_event::ClickEvent;

/// Errors raised while delivering an analytics event.
///
/// Never propagated past the dispatcher: delivery is best-effort and
/// at-most-once.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("analytics transport error: {0}")]
    Transport(String),

    #[error("analytics service responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("analytics delivery timed out after {0} ms")]
    Timeout(u64),
}

/// Destination for click events.
///
/// # Implementations
///
/// - [`crate::infrastructure::analytics::HttpAnalyticsSink`] - POSTs to the analytics service
/// - [`crate::infrastructure::analytics::LogAnalyticsSink`] - Logs events only
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Delivers a single event. No acknowledgment is consumed by the caller.
    async fn emit(&self, event: &ClickEvent) -> Result<(), AnalyticsError>;
}
