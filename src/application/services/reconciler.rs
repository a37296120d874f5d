//! Moves cached click deltas into the durable store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::repositories::MappingRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;

/// Outcome of one reconciliation run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Click counters found in the cache.
    pub scanned: usize,
    /// Counters whose delta was applied to the store.
    pub flushed: usize,
    /// Total clicks moved into the store.
    pub clicks: i64,
    /// Counters whose delta could not be applied and was put back.
    pub failed: usize,
    /// True if another run was in progress and this one did nothing.
    pub skipped: bool,
}

impl ReconcileReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Periodic counter flush.
///
/// Each pending counter is read-and-cleared atomically (`GETDEL`), then the
/// delta is added to the durable count. If the store write fails, the delta is
/// added back to the cache counter so the next run picks it up. Clicks landing
/// between the take and the restore accumulate in a fresh counter and are
/// summed with the restored delta, so none are lost or counted twice.
///
/// A run executes on its own task and holds the run lock until it finishes,
/// so dropping the caller's future never splits a take from its write or
/// restore. Only one run executes at a time per process; overlapping calls
/// return a report with `skipped = true`.
pub struct Reconciler<R: MappingRepository + ?Sized = dyn MappingRepository> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    run_lock: Arc<Mutex<()>>,
    stopping: Arc<AtomicBool>,
}

impl<R: MappingRepository + ?Sized + 'static> Reconciler<R> {
    /// Creates a new reconciler.
    pub fn new(repository: Arc<R>, cache: Arc<dyn CacheService>) -> Self {
        Self {
            repository,
            cache,
            run_lock: Arc::new(Mutex::new(())),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flushes every pending click counter.
    ///
    /// Per-code failures are counted in the report, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the pending counters cannot be listed.
    pub async fn run(&self) -> Result<ReconcileReport, AppError> {
        let Ok(guard) = self.run_lock.clone().try_lock_owned() else {
            info!("Reconciliation already running, skipping");
            return Ok(ReconcileReport::skipped());
        };

        let pass = FlushPass {
            repository: self.repository.clone(),
            cache: self.cache.clone(),
            stopping: self.stopping.clone(),
        };

        tokio::spawn(async move {
            let _guard = guard;
            pass.run().await
        })
        .await
        .map_err(|e| {
            AppError::internal(
                "Reconciliation task failed",
                json!({ "reason": e.to_string() }),
            )
        })?
    }

    /// Makes the run in flight, and every later one, stop after the current
    /// counter. Counters not yet visited stay in the cache.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    /// Waits until no run is in flight.
    pub async fn wait_idle(&self) {
        let _idle = self.run_lock.lock().await;
    }
}

struct FlushPass<R: ?Sized> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    stopping: Arc<AtomicBool>,
}

impl<R: MappingRepository + ?Sized> FlushPass<R> {
    async fn run(self) -> Result<ReconcileReport, AppError> {
        let codes = self.cache.pending_codes().await.map_err(|e| {
            AppError::store_unavailable(
                "Failed to list pending click counters",
                json!({ "reason": e.to_string() }),
            )
        })?;

        let mut report = ReconcileReport {
            scanned: codes.len(),
            ..ReconcileReport::default()
        };

        for (visited, code) in codes.iter().enumerate() {
            if self.stopping.load(Ordering::SeqCst) {
                info!(
                    "Reconciliation stopped, {} counters left in cache",
                    codes.len() - visited
                );
                break;
            }

            match self.flush(code).await {
                Ok(0) => {}
                Ok(clicks) => {
                    report.flushed += 1;
                    report.clicks += clicks;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("Failed to reconcile clicks for {}: {}", code, e);
                }
            }
        }

        metrics::counter!("reconcile_clicks_flushed_total").increment(report.clicks as u64);
        info!(
            scanned = report.scanned,
            flushed = report.flushed,
            clicks = report.clicks,
            failed = report.failed,
            "Reconciliation finished"
        );

        Ok(report)
    }

    /// Flushes one counter and returns the number of clicks moved.
    async fn flush(&self, short_code: &str) -> Result<i64, AppError> {
        let delta = self.cache.take_clicks(short_code).await.map_err(|e| {
            AppError::store_unavailable(
                "Failed to read click counter",
                json!({ "code": short_code, "reason": e.to_string() }),
            )
        })?;

        if delta <= 0 {
            return Ok(0);
        }

        match self.repository.add_clicks(short_code, delta).await {
            Ok(true) => {
                debug!("Reconciled {} clicks for {}", delta, short_code);
                Ok(delta)
            }
            Ok(false) => {
                warn!(
                    "Dropping {} clicks for {}: no durable record",
                    delta, short_code
                );
                Ok(0)
            }
            Err(e) => {
                if let Err(restore_err) = self.cache.add_clicks(short_code, delta).await {
                    error!(
                        "Lost {} clicks for {}: store failed ({}) and restore failed ({})",
                        delta, short_code, e, restore_err
                    );
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;

    use crate::application::services::test_support::SlowStore;
    use crate::domain::repositories::MockMappingRepository;
    use crate::infrastructure::cache::{CacheError, MemoryCache, MockCacheService};

    #[tokio::test]
    async fn test_run_moves_deltas_into_store() {
        let mut repo = MockMappingRepository::new();
        repo.expect_add_clicks()
            .withf(|code, delta| code == "aaaaaa" && *delta == 3)
            .times(1)
            .returning(|_, _| Ok(true));
        repo.expect_add_clicks()
            .withf(|code, delta| code == "bbbbbb" && *delta == 2)
            .times(1)
            .returning(|_, _| Ok(true));

        let cache = Arc::new(MemoryCache::new(3600));
        cache.add_clicks("aaaaaa", 3).await.unwrap();
        cache.add_clicks("bbbbbb", 2).await.unwrap();

        let reconciler = Reconciler::new(Arc::new(repo), cache.clone());
        let report = reconciler.run().await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.flushed, 2);
        assert_eq!(report.clicks, 5);
        assert_eq!(report.failed, 0);
        assert!(cache.pending_codes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let mut repo = MockMappingRepository::new();
        repo.expect_add_clicks().times(1).returning(|_, _| Ok(true));

        let cache = Arc::new(MemoryCache::new(3600));
        cache.add_clicks("aaaaaa", 4).await.unwrap();

        let reconciler = Reconciler::new(Arc::new(repo), cache);
        assert_eq!(reconciler.run().await.unwrap().clicks, 4);

        let second = reconciler.run().await.unwrap();
        assert_eq!(second.clicks, 0);
        assert_eq!(second.scanned, 0);
    }

    #[tokio::test]
    async fn test_store_failure_restores_delta() {
        let mut repo = MockMappingRepository::new();
        repo.expect_add_clicks()
            .times(1)
            .returning(|_, _| Err(AppError::store_unavailable("Database unavailable", json!({}))));

        let cache = Arc::new(MemoryCache::new(3600));
        cache.add_clicks("aaaaaa", 7).await.unwrap();

        let reconciler = Reconciler::new(Arc::new(repo), cache.clone());
        let report = reconciler.run().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.clicks, 0);
        assert_eq!(cache.peek_clicks("aaaaaa").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_unknown_code_delta_is_dropped() {
        let mut repo = MockMappingRepository::new();
        repo.expect_add_clicks().times(1).returning(|_, _| Ok(false));

        let cache = Arc::new(MemoryCache::new(3600));
        cache.add_clicks("ghost1", 2).await.unwrap();

        let reconciler = Reconciler::new(Arc::new(repo), cache.clone());
        let report = reconciler.run().await.unwrap();

        assert_eq!(report.flushed, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(cache.peek_clicks("ghost1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let repo = MockMappingRepository::new();
        let mut cache = MockCacheService::new();
        cache
            .expect_pending_codes()
            .returning(|| Err(CacheError::ConnectionError("down".to_string())));

        let reconciler = Reconciler::new(Arc::new(repo), Arc::new(cache));

        assert!(matches!(
            reconciler.run().await,
            Err(AppError::Store { .. })
        ));
    }

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let repo = MockMappingRepository::new();
        let cache = Arc::new(MemoryCache::new(3600));
        let reconciler = Reconciler::new(Arc::new(repo), cache);

        let _held = reconciler.run_lock.lock().await;
        let report = reconciler.run().await.unwrap();

        assert!(report.skipped);
        assert_eq!(report.scanned, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_still_lands_clicks() {
        let store = Arc::new(SlowStore::new(Duration::from_secs(30)));
        store.insert("aaaaaa", Utc::now());

        let cache = Arc::new(MemoryCache::new(3600));
        cache.add_clicks("aaaaaa", 5).await.unwrap();

        let reconciler = Reconciler::new(store.clone(), cache.clone());
        let outcome = tokio::time::timeout(Duration::from_secs(10), reconciler.run()).await;
        assert!(outcome.is_err());

        reconciler.wait_idle().await;

        assert_eq!(store.clicks("aaaaaa"), 5);
        assert_eq!(cache.peek_clicks("aaaaaa").await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_is_skipped_while_cancelled_run_finishes() {
        let store = Arc::new(SlowStore::new(Duration::from_secs(30)));
        store.insert("aaaaaa", Utc::now());

        let cache = Arc::new(MemoryCache::new(3600));
        cache.add_clicks("aaaaaa", 2).await.unwrap();

        let reconciler = Reconciler::new(store.clone(), cache);
        let _ = tokio::time::timeout(Duration::from_secs(10), reconciler.run()).await;

        assert!(reconciler.run().await.unwrap().skipped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_leaves_unvisited_counters_in_cache() {
        let store = Arc::new(SlowStore::new(Duration::from_secs(30)));
        store.insert("aaaaaa", Utc::now());
        store.insert("bbbbbb", Utc::now());

        let cache = Arc::new(MemoryCache::new(3600));
        cache.add_clicks("aaaaaa", 3).await.unwrap();
        cache.add_clicks("bbbbbb", 4).await.unwrap();

        let reconciler = Reconciler::new(store.clone(), cache.clone());
        let _ = tokio::time::timeout(Duration::from_secs(10), reconciler.run()).await;
        reconciler.stop();
        reconciler.wait_idle().await;

        assert_eq!(cache.pending_codes().await.unwrap().len(), 1);
        let durable = store.clicks("aaaaaa") + store.clicks("bbbbbb");
        let pending = cache.peek_clicks("aaaaaa").await.unwrap()
            + cache.peek_clicks("bbbbbb").await.unwrap();
        assert_eq!(durable + pending, 7);
        assert!(durable > 0);

        let after_stop = reconciler.run().await.unwrap();
        assert_eq!(after_stop.clicks, 0);
    }
}
