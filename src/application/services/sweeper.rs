//! Retention-based expiry of old mappings.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::repositories::MappingRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;

/// Default number of mappings processed per store query.
pub const DEFAULT_SWEEP_BATCH_SIZE: i64 = 500;

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expirable mappings examined.
    pub scanned: usize,
    /// Mappings flagged expired by this run.
    pub expired: usize,
    /// Mappings whose cache entries could not be fully purged.
    pub cache_failures: usize,
    /// True if another sweep was in progress and this one did nothing.
    pub skipped: bool,
}

impl SweepReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Expires mappings older than the retention window.
///
/// For each candidate, pending cached clicks are drained into the durable
/// count first, then the snapshot is dropped from the cache, then the durable
/// record is flagged expired. Records are never deleted.
///
/// Cache purge failures are logged and counted; the durable flag is still
/// set, and a stale snapshot lives at most until its TTL lapses.
///
/// Like [`Reconciler`](super::Reconciler), a sweep runs on its own task and
/// holds the run lock until it finishes, so a drained counter always reaches
/// the store or goes back to the cache.
pub struct Sweeper<R: MappingRepository + ?Sized = dyn MappingRepository> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    retention: Duration,
    batch_size: i64,
    run_lock: Arc<Mutex<()>>,
    stopping: Arc<AtomicBool>,
}

impl<R: MappingRepository + ?Sized + 'static> Sweeper<R> {
    /// Creates a sweeper expiring mappings older than `retention_days`.
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn CacheService>,
        retention_days: u32,
        batch_size: i64,
    ) -> Self {
        Self {
            repository,
            cache,
            retention: Duration::days(i64::from(retention_days)),
            batch_size: batch_size.max(1),
            run_lock: Arc::new(Mutex::new(())),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mappings created strictly before this instant are expirable at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.retention
    }

    /// Counts mappings a sweep at `now` would expire.
    pub async fn preview(&self, now: DateTime<Utc>) -> Result<i64, AppError> {
        self.repository.count_expirable(self.cutoff(now)).await
    }

    /// Sweeps using the current time.
    pub async fn run(&self) -> Result<SweepReport, AppError> {
        self.run_at(Utc::now()).await
    }

    /// Expires every mapping older than the retention window at `now`.
    ///
    /// # Errors
    ///
    /// Returns the store error that interrupted the sweep. Mappings handled
    /// before the failure stay expired; the next run resumes with the rest.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let Ok(guard) = self.run_lock.clone().try_lock_owned() else {
            info!("Sweep already running, skipping");
            return Ok(SweepReport::skipped());
        };

        let pass = SweepPass {
            repository: self.repository.clone(),
            cache: self.cache.clone(),
            cutoff: self.cutoff(now),
            batch_size: self.batch_size,
            stopping: self.stopping.clone(),
        };

        tokio::spawn(async move {
            let _guard = guard;
            pass.run().await
        })
        .await
        .map_err(|e| AppError::internal("Sweep task failed", json!({ "reason": e.to_string() })))?
    }

    /// Makes the sweep in flight, and every later one, stop after the current
    /// mapping.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    /// Waits until no sweep is in flight.
    pub async fn wait_idle(&self) {
        let _idle = self.run_lock.lock().await;
    }
}

struct SweepPass<R: ?Sized> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    cutoff: DateTime<Utc>,
    batch_size: i64,
    stopping: Arc<AtomicBool>,
}

impl<R: MappingRepository + ?Sized> SweepPass<R> {
    async fn run(self) -> Result<SweepReport, AppError> {
        let cutoff = self.cutoff;
        let mut report = SweepReport::default();

        'batches: loop {
            let batch = self
                .repository
                .find_expirable(cutoff, self.batch_size)
                .await?;
            let batch_len = batch.len();
            if batch_len == 0 {
                break;
            }

            let mut progressed = 0;
            for mapping in batch {
                if self.stopping.load(Ordering::SeqCst) {
                    info!("Sweep stopped after {} mappings", report.scanned);
                    break 'batches;
                }

                report.scanned += 1;

                if !self.purge_cache(&mapping.short_code).await {
                    report.cache_failures += 1;
                }

                if self.repository.mark_expired(&mapping.short_code).await? {
                    report.expired += 1;
                    progressed += 1;
                    debug!("Expired {}", mapping.short_code);
                }
            }

            // A short batch is the last one. No progress means every row was
            // flipped by someone else and re-querying would loop.
            if (batch_len as i64) < self.batch_size || progressed == 0 {
                break;
            }
        }

        metrics::counter!("sweep_mappings_expired_total").increment(report.expired as u64);
        info!(
            scanned = report.scanned,
            expired = report.expired,
            cache_failures = report.cache_failures,
            %cutoff,
            "Sweep finished"
        );

        Ok(report)
    }

    /// Drains the click counter into the store and drops the snapshot.
    ///
    /// Returns false if any cache step failed.
    async fn purge_cache(&self, short_code: &str) -> bool {
        let mut clean = true;

        match self.cache.take_clicks(short_code).await {
            Ok(delta) if delta > 0 => {
                if let Err(e) = self.repository.add_clicks(short_code, delta).await {
                    warn!("Failed to drain {} clicks for {}: {}", delta, short_code, e);
                    // Put it back for the reconciler, which ignores the expired flag.
                    if self.cache.add_clicks(short_code, delta).await.is_err() {
                        warn!("Lost {} clicks for {}", delta, short_code);
                    }
                    clean = false;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to drain click counter for {}: {}", short_code, e);
                clean = false;
            }
        }

        if let Err(e) = self.cache.delete_mapping(short_code).await {
            warn!("Failed to evict {} from cache: {}", short_code, e);
            clean = false;
        }

        clean
    }
}
