//! No-op cache implementation for disabled caching.

use super::service::{CacheResult, CacheService};
use crate::domain::entities::CachedMapping;
use async_trait::async_trait;
use tracing::debug;

/// A cache implementation that stores nothing.
///
/// Used when Redis is unavailable or caching is explicitly disabled. Every
/// lookup misses, so the resolver counts every click directly in the durable
/// store and the reconciler always finds nothing to drain.
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get_mapping(&self, _short_code: &str) -> CacheResult<Option<CachedMapping>> {
        Ok(None)
    }

    async fn set_mapping(
        &self,
        _mapping: &CachedMapping,
        _ttl_seconds: Option<u64>,
    ) -> CacheResult<()> {
        Ok(())
    }

    async fn delete_mapping(&self, _short_code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn increment_clicks(&self, _short_code: &str) -> CacheResult<i64> {
        Ok(0)
    }

    async fn add_clicks(&self, _short_code: &str, _delta: i64) -> CacheResult<i64> {
        Ok(0)
    }

    async fn peek_clicks(&self, _short_code: &str) -> CacheResult<i64> {
        Ok(0)
    }

    async fn take_clicks(&self, _short_code: &str) -> CacheResult<i64> {
        Ok(0)
    }

    async fn delete_clicks(&self, _short_code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn pending_codes(&self) -> CacheResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "none"
    }
}
