//! Cache service trait and error types.

use async_trait::async_trait;

use crate::domain::entities::CachedMapping;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    #[error("Cache operation error: {0}")]
    OperationError(String),

    #[error("Cache serialization error: {0}")]
    SerializationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for the TTL cache holding mapping snapshots and click counters.
///
/// Two key families are maintained per short code:
///
/// - a **mapping snapshot** with a TTL, written on create and on read-miss
/// - a **click counter** holding the clicks not yet reconciled into the
///   durable store; it has no TTL and is only cleared by [`take_clicks`]
///   or [`delete_clicks`]
///
/// Implementations report failures as [`CacheError`]; callers decide how to
/// degrade (the resolver falls back to the durable store).
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process cache for single-node setups
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
///
/// [`take_clicks`]: CacheService::take_clicks
/// [`delete_clicks`]: CacheService::delete_clicks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Retrieves the mapping snapshot for a short code.
    ///
    /// Returns `Ok(None)` on miss or when the entry's TTL has lapsed.
    async fn get_mapping(&self, short_code: &str) -> CacheResult<Option<CachedMapping>>;

    /// Stores a mapping snapshot.
    ///
    /// `ttl_seconds = None` applies the implementation's default TTL.
    async fn set_mapping(
        &self,
        mapping: &CachedMapping,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()>;

    /// Removes a mapping snapshot. Absence is not an error.
    async fn delete_mapping(&self, short_code: &str) -> CacheResult<()>;

    /// Atomically increments the click counter, creating it at 1.
    ///
    /// Returns the post-increment value.
    async fn increment_clicks(&self, short_code: &str) -> CacheResult<i64>;

    /// Atomically adds `delta` to the click counter, creating it if absent.
    async fn add_clicks(&self, short_code: &str, delta: i64) -> CacheResult<i64>;

    /// Reads the click counter without modifying it. Absent counters read as 0.
    async fn peek_clicks(&self, short_code: &str) -> CacheResult<i64>;

    /// Atomically reads and removes the click counter. Absent counters read as 0.
    ///
    /// Increments racing with this call land either in the returned value or
    /// in a fresh counter, never in neither.
    async fn take_clicks(&self, short_code: &str) -> CacheResult<i64>;

    /// Removes the click counter. Absence is not an error.
    async fn delete_clicks(&self, short_code: &str) -> CacheResult<()>;

    /// Lists short codes that currently have a click counter.
    async fn pending_codes(&self) -> CacheResult<Vec<String>>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;

    /// Backend name reported by health checks.
    fn backend_name(&self) -> &'static str;
}
