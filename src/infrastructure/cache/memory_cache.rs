//! In-process cache implementation backed by `DashMap`.

use super::service::{CacheResult, CacheService};
use crate::domain::entities::CachedMapping;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Thread-safe in-memory cache for single-node deployments and tests.
///
/// Snapshots carry their own deadline and are treated as absent once it has
/// passed. Counter operations run under the owning shard's lock, which makes
/// increment and fetch-and-clear atomic with respect to each other.
#[derive(Clone)]
pub struct MemoryCache {
    mappings: Arc<DashMap<String, (CachedMapping, Instant)>>,
    clicks: Arc<DashMap<String, i64>>,
    default_ttl: Duration,
}

impl MemoryCache {
    /// Creates an empty cache applying `default_ttl_seconds` to snapshots.
    pub fn new(default_ttl_seconds: u64) -> Self {
        debug!("Using MemoryCache (TTL: {}s)", default_ttl_seconds);
        Self {
            mappings: Arc::new(DashMap::new()),
            clicks: Arc::new(DashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_seconds),
        }
    }

    /// Number of live mapping snapshots.
    pub fn mapping_count(&self) -> usize {
        let now = Instant::now();
        self.mappings
            .iter()
            .filter(|entry| entry.value().1 > now)
            .count()
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get_mapping(&self, short_code: &str) -> CacheResult<Option<CachedMapping>> {
        let now = Instant::now();

        if let Some(entry) = self.mappings.get(short_code) {
            let (mapping, deadline) = entry.value();
            if *deadline > now {
                return Ok(Some(mapping.clone()));
            }
        }

        self.mappings
            .remove_if(short_code, |_, (_, deadline)| *deadline <= now);
        Ok(None)
    }

    async fn set_mapping(
        &self,
        mapping: &CachedMapping,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()> {
        let ttl = ttl_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_ttl);

        self.mappings.insert(
            mapping.short_code.clone(),
            (mapping.clone(), Instant::now() + ttl),
        );
        Ok(())
    }

    async fn delete_mapping(&self, short_code: &str) -> CacheResult<()> {
        self.mappings.remove(short_code);
        Ok(())
    }

    async fn increment_clicks(&self, short_code: &str) -> CacheResult<i64> {
        self.add_clicks(short_code, 1).await
    }

    async fn add_clicks(&self, short_code: &str, delta: i64) -> CacheResult<i64> {
        let mut counter = self.clicks.entry(short_code.to_string()).or_insert(0);
        *counter += delta;
        Ok(*counter)
    }

    async fn peek_clicks(&self, short_code: &str) -> CacheResult<i64> {
        Ok(self.clicks.get(short_code).map(|v| *v).unwrap_or(0))
    }

    async fn take_clicks(&self, short_code: &str) -> CacheResult<i64> {
        Ok(self
            .clicks
            .remove(short_code)
            .map(|(_, v)| v)
            .unwrap_or(0))
    }

    async fn delete_clicks(&self, short_code: &str) -> CacheResult<()> {
        self.clicks.remove(short_code);
        Ok(())
    }

    async fn pending_codes(&self) -> CacheResult<Vec<String>> {
        Ok(self.clicks.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
