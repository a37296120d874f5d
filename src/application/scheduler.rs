//! Background schedules for reconciliation and sweeping.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at, timeout};
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{error, info, warn};

use crate::application::services::{ReconcileReport, Reconciler, SweepReport, Sweeper};
use crate::error::AppError;

/// Retry policy for scheduled runs.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub attempts: usize,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delays between attempts; yields `attempts - 1` items.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        FixedInterval::new(self.backoff).take(self.attempts.saturating_sub(1))
    }

    /// Runs `action` until it succeeds or the attempts are spent.
    ///
    /// Returns the last error if every attempt failed.
    pub async fn run<T, F, Fut>(&self, job: &str, mut action: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 0;
        let attempts = self.attempts.max(1);

        Retry::spawn(self.strategy(), || {
            attempt += 1;
            let current = attempt;
            let fut = action();
            async move {
                fut.await.inspect_err(|e| {
                    warn!("{} attempt {}/{} failed: {}", job, current, attempts, e);
                })
            }
        })
        .await
    }
}

/// Runs one reconciliation, retrying while any counter fails to flush.
///
/// Returns `None` when every attempt failed; the failure is logged.
pub async fn run_reconcile_cycle(
    reconciler: &Reconciler,
    retry: &RetryPolicy,
) -> Option<ReconcileReport> {
    let result = retry
        .run("Reconciliation", || async move {
            let report = reconciler.run().await?;
            if report.failed > 0 {
                return Err(AppError::store_unavailable(
                    "Some click counters could not be reconciled",
                    serde_json::json!({ "failed": report.failed, "flushed": report.flushed }),
                ));
            }
            Ok(report)
        })
        .await;

    match result {
        Ok(report) => Some(report),
        Err(e) => {
            error!("Reconciliation failed after {} attempts: {}", retry.attempts, e);
            None
        }
    }
}

/// Runs one sweep; failures are logged and left for the next run.
pub async fn run_sweep_cycle(sweeper: &Sweeper) -> Option<SweepReport> {
    match sweeper.run().await {
        Ok(report) => Some(report),
        Err(e) => {
            error!("Sweep failed: {}", e);
            None
        }
    }
}

/// Spawns the periodic reconciliation job. The first run starts immediately.
pub fn spawn_reconcile_job(
    reconciler: Arc<Reconciler>,
    period: Duration,
    retry: RetryPolicy,
) -> JoinHandle<()> {
    info!("Reconciliation scheduled every {}s", period.as_secs());

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            run_reconcile_cycle(&reconciler, &retry).await;
        }
    })
}

/// Spawns the sweep job: once at startup, then every `period` starting at the
/// next `at` (UTC wall clock).
pub fn spawn_sweep_job(sweeper: Arc<Sweeper>, period: Duration, at: NaiveTime) -> JoinHandle<()> {
    let first = delay_until(at, Utc::now());
    info!(
        "Sweep scheduled daily at {} UTC (next in {}s), every {}s",
        at.format("%H:%M"),
        first.as_secs(),
        period.as_secs()
    );

    tokio::spawn(async move {
        run_sweep_cycle(&sweeper).await;

        let mut ticker = interval_at(Instant::now() + first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            run_sweep_cycle(&sweeper).await;
        }
    })
}

/// Stops the background jobs and flushes what the cache still holds.
///
/// The job tasks are aborted and awaited, and the sweep in flight is stopped
/// and waited for. One last reconciliation then runs within `limit`, after any
/// run the aborted job left behind. If it overruns, it is stopped and the
/// counter in flight is written or put back before this returns.
pub async fn drain_on_shutdown(
    jobs: Vec<JoinHandle<()>>,
    reconciler: &Reconciler,
    sweeper: &Sweeper,
    limit: Duration,
) -> Option<ReconcileReport> {
    for job in jobs {
        job.abort();
        let _ = job.await;
    }

    sweeper.stop();
    sweeper.wait_idle().await;

    let flush = async {
        reconciler.wait_idle().await;
        reconciler.run().await
    };

    match timeout(limit, flush).await {
        Ok(Ok(report)) => {
            info!("Flushed {} pending clicks on shutdown", report.clicks);
            Some(report)
        }
        Ok(Err(e)) => {
            warn!("Final reconciliation failed: {}", e);
            None
        }
        Err(_) => {
            warn!(
                "Final reconciliation timed out after {}s, leaving the rest in cache",
                limit.as_secs()
            );
            reconciler.stop();
            reconciler.wait_idle().await;
            None
        }
    }
}

/// Time from `now` until the next occurrence of `at`.
///
/// If `now` is exactly `at`, the next occurrence is a day later.
pub fn delay_until(at: NaiveTime, now: DateTime<Utc>) -> Duration {
    let today = now.date_naive().and_time(at).and_utc();
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };

    (next - now).to_std().unwrap_or_default()
}
