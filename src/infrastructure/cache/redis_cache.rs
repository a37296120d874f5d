//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use crate::domain::entities::CachedMapping;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, info};

const MAPPING_PREFIX: &str = "url:";
const CLICKS_PREFIX: &str = "clicks:";
const SCAN_BATCH: usize = 500;

/// Redis cache for mapping snapshots and click counters.
///
/// Uses connection pooling via `ConnectionManager` for efficient connection reuse.
/// Snapshots are stored as JSON under `url:{code}` with `SETEX`; counters are
/// plain integers under `clicks:{code}` driven by `INCR`, `INCRBY` and `GETDEL`
/// (Redis 6.2+).
pub struct RedisCache {
    client: ConnectionManager,
    default_ttl: u64,
}

impl RedisCache {
    /// Connects to Redis, validates the connection with a PING, and configures the default TTL.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `default_ttl_seconds` - TTL applied to snapshots when [`CacheService::set_mapping`]
    ///   is called with `ttl_seconds = None`; controlled via `CACHE_TTL_SECONDS` env var
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, default_ttl_seconds: u64) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl: default_ttl_seconds,
        })
    }
}

fn mapping_key(short_code: &str) -> String {
    format!("{}{}", MAPPING_PREFIX, short_code)
}

fn clicks_key(short_code: &str) -> String {
    format!("{}{}", CLICKS_PREFIX, short_code)
}

fn code_from_clicks_key(key: &str) -> Option<&str> {
    key.strip_prefix(CLICKS_PREFIX).filter(|code| !code.is_empty())
}

fn op_error(op: &str, short_code: &str, e: redis::RedisError) -> CacheError {
    CacheError::OperationError(format!("{} {}: {}", op, short_code, e))
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_mapping(&self, short_code: &str) -> CacheResult<Option<CachedMapping>> {
        let mut conn = self.client.clone();

        let raw = conn
            .get::<_, Option<String>>(mapping_key(short_code))
            .await
            .map_err(|e| op_error("GET", short_code, e))?;

        match raw {
            Some(json) => {
                debug!("Cache HIT: {}", short_code);
                serde_json::from_str(&json)
                    .map(Some)
                    .map_err(|e| CacheError::SerializationError(e.to_string()))
            }
            None => {
                debug!("Cache MISS: {}", short_code);
                Ok(None)
            }
        }
    }

    async fn set_mapping(
        &self,
        mapping: &CachedMapping,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()> {
        let mut conn = self.client.clone();
        let ttl_seconds = ttl_seconds.unwrap_or(self.default_ttl);
        let json = serde_json::to_string(mapping)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        conn.set_ex::<_, _, ()>(mapping_key(&mapping.short_code), json, ttl_seconds)
            .await
            .map_err(|e| op_error("SETEX", &mapping.short_code, e))?;

        debug!(
            "Cache SET: {} -> {} (TTL: {}s)",
            mapping.short_code, mapping.target_url, ttl_seconds
        );
        Ok(())
    }

    async fn delete_mapping(&self, short_code: &str) -> CacheResult<()> {
        let mut conn = self.client.clone();

        let deleted = conn
            .del::<_, i64>(mapping_key(short_code))
            .await
            .map_err(|e| op_error("DEL", short_code, e))?;

        if deleted > 0 {
            debug!("Cache INVALIDATE: {}", short_code);
        }
        Ok(())
    }

    async fn increment_clicks(&self, short_code: &str) -> CacheResult<i64> {
        self.add_clicks(short_code, 1).await
    }

    async fn add_clicks(&self, short_code: &str, delta: i64) -> CacheResult<i64> {
        let mut conn = self.client.clone();

        conn.incr::<_, _, i64>(clicks_key(short_code), delta)
            .await
            .map_err(|e| op_error("INCRBY", short_code, e))
    }

    async fn peek_clicks(&self, short_code: &str) -> CacheResult<i64> {
        let mut conn = self.client.clone();

        let value = conn
            .get::<_, Option<i64>>(clicks_key(short_code))
            .await
            .map_err(|e| op_error("GET", short_code, e))?;

        Ok(value.unwrap_or(0))
    }

    async fn take_clicks(&self, short_code: &str) -> CacheResult<i64> {
        let mut conn = self.client.clone();

        let value = redis::cmd("GETDEL")
            .arg(clicks_key(short_code))
            .query_async::<Option<i64>>(&mut conn)
            .await
            .map_err(|e| op_error("GETDEL", short_code, e))?;

        Ok(value.unwrap_or(0))
    }

    async fn delete_clicks(&self, short_code: &str) -> CacheResult<()> {
        let mut conn = self.client.clone();

        conn.del::<_, i64>(clicks_key(short_code))
            .await
            .map_err(|e| op_error("DEL", short_code, e))?;
        Ok(())
    }

    async fn pending_codes(&self) -> CacheResult<Vec<String>> {
        let mut conn = self.client.clone();
        let pattern = format!("{}*", CLICKS_PREFIX);
        let mut cursor: u64 = 0;
        let mut codes = Vec::new();

        loop {
            let (next, keys) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async::<(u64, Vec<String>)>(&mut conn)
                .await
                .map_err(|e| CacheError::OperationError(format!("SCAN: {}", e)))?;

            codes.extend(
                keys.iter()
                    .filter_map(|key| code_from_clicks_key(key))
                    .map(str::to_string),
            );

            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once.
        codes.sort_unstable();
        codes.dedup();
        Ok(codes)
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
