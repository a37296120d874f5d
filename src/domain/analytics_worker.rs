//! Background dispatcher delivering click events to the analytics sink.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use crate::domain::analytics::{AnalyticsError, AnalyticsSink};
use crate::domain::click_event::ClickEvent;

/// Drains the click channel and delivers each event off the request path.
///
/// Each delivery runs on its own task, at most `concurrency` at a time, and is
/// bounded by `timeout`. Failures are logged and discarded. Returns when every
/// sender has been dropped.
pub async fn run_analytics_dispatcher(
    mut rx: mpsc::Receiver<ClickEvent>,
    sink: Arc<dyn AnalyticsSink>,
    concurrency: usize,
    timeout: Duration,
) {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));

    while let Some(event) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let sink = sink.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let code = event.short_code.clone();
            if let Err(e) = deliver(sink.as_ref(), &event, timeout).await {
                warn!(short_code = %code, "Analytics delivery failed: {}", e);
            }
        });
    }

    debug!("Analytics channel closed, dispatcher stopped");
}

/// Delivers one event with a timeout.
pub async fn deliver(
    sink: &dyn AnalyticsSink,
    event: &ClickEvent,
    timeout: Duration,
) -> Result<(), AnalyticsError> {
    match tokio::time::timeout(timeout, sink.emit(event)).await {
        Ok(result) => result,
        Err(_) => Err(AnalyticsError::Timeout(timeout.as_millis() as u64)),
    }
}
