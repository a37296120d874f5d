//! Short link creation, resolution and statistics.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::domain::click_event::{ClickContext, ClickEvent};
use crate::domain::entities::{Mapping, MappingStats, NewMapping};
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::code_generator::{DEFAULT_CODE_LENGTH, generate_code, is_valid_code};
use crate::utils::url_normalizer::normalize_url;

/// Tunables for [`ResolverService`].
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Length of generated short codes.
    pub code_length: usize,
    /// Upper bound on code generation attempts per `create` call.
    pub max_code_attempts: usize,
    /// TTL applied to cached mapping snapshots.
    pub cache_ttl_seconds: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            max_code_attempts: 10,
            cache_ttl_seconds: 3600,
        }
    }
}

/// Outcome of a single code allocation attempt.
#[derive(Debug)]
pub enum CodeAllocation {
    /// The code was free and the mapping is now persisted.
    Allocated(Mapping),
    /// The code already exists; another attempt may succeed.
    Collision,
    /// The attempt budget is spent.
    Exhausted,
}

/// Orchestrates the cache and the durable store for create / resolve / stats.
///
/// # Click accounting
///
/// - **Cache hit**: the click goes to the cache counter (`INCR`) and is moved
///   into the durable count later by the [`super::Reconciler`].
/// - **Cache miss**: the click goes straight to the durable count with an
///   atomic `UPDATE`, then the snapshot is re-cached.
///
/// A hit does not re-check the durable `expired` flag. A mapping expired after
/// being cached keeps resolving until its snapshot TTL lapses or the
/// [`super::Sweeper`] purges it.
///
/// Cache failures never reach the caller: reads degrade to misses and counter
/// increments degrade to durable increments.
pub struct ResolverService<R: MappingRepository + ?Sized = dyn MappingRepository> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    click_sender: mpsc::Sender<ClickEvent>,
    settings: ResolverSettings,
}

impl<R: MappingRepository + ?Sized> ResolverService<R> {
    /// Creates a new resolver service.
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn CacheService>,
        click_sender: mpsc::Sender<ClickEvent>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            click_sender,
            settings,
        }
    }

    /// Creates a mapping for `target` under a freshly generated code.
    ///
    /// The target is normalized first (see [`normalize_url`]); the stored and
    /// returned URL is the normalized form.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the target is not an http(s) URL.
    /// Returns [`AppError::CapacityExceeded`] if every generated code collided.
    /// Returns [`AppError::Store`] if the durable store is unreachable.
    pub async fn create(&self, target: &str) -> Result<Mapping, AppError> {
        let target_url = normalize_url(target).map_err(|e| {
            AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
        })?;

        let mapping = self.allocate(&target_url).await?;
        self.warm(&mapping).await;

        debug!("Created {} -> {}", mapping.short_code, mapping.target_url);
        Ok(mapping)
    }

    /// Resolves a short code to its target and counts the click.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for unknown or malformed codes.
    /// Returns [`AppError::Gone`] if the durable record is flagged expired
    /// (only observable on a cache miss).
    /// Returns [`AppError::Store`] if the durable store is unreachable.
    pub async fn resolve(&self, short_code: &str, context: ClickContext) -> Result<String, AppError> {
        if !is_valid_code(short_code) {
            return Err(not_found(short_code));
        }

        match self.cache.get_mapping(short_code).await {
            Ok(Some(cached)) => {
                metrics::counter!("cache_hits_total").increment(1);
                self.count_cached_click(short_code).await?;
                self.emit(short_code, context);
                return Ok(cached.target_url);
            }
            Ok(None) => {
                metrics::counter!("cache_misses_total").increment(1);
            }
            Err(e) => {
                metrics::counter!("cache_errors_total").increment(1);
                warn!("Cache read failed for {}, using store: {}", short_code, e);
            }
        }

        let target_url = self.resolve_from_store(short_code).await?;
        self.emit(short_code, context);
        Ok(target_url)
    }

    /// Returns the mapping with its merged click count.
    ///
    /// The count is the durable count plus any click delta still waiting in
    /// the cache. If the cache has no counter or cannot be reached, the pure
    /// durable count is returned. Never mutates state.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for unknown or malformed codes.
    pub async fn stats(&self, short_code: &str) -> Result<MappingStats, AppError> {
        if !is_valid_code(short_code) {
            return Err(not_found(short_code));
        }

        let mapping = self
            .repository
            .find_by_code(short_code)
            .await?
            .ok_or_else(|| not_found(short_code))?;

        let pending = match self.cache.peek_clicks(short_code).await {
            Ok(pending) => pending.max(0),
            Err(e) => {
                warn!("Cache counter read failed for {}: {}", short_code, e);
                0
            }
        };

        Ok(MappingStats {
            short_code: mapping.short_code,
            target_url: mapping.target_url,
            clicks: mapping.clicks + pending,
            created_at: mapping.created_at,
            expired: mapping.expired,
        })
    }

    /// Allocates a code, retrying on collisions until the attempt budget is spent.
    async fn allocate(&self, target_url: &str) -> Result<Mapping, AppError> {
        let mut attempt = 0;

        loop {
            match self.try_allocate(target_url, attempt).await? {
                CodeAllocation::Allocated(mapping) => return Ok(mapping),
                CodeAllocation::Collision => {
                    attempt += 1;
                    debug!("Short code collision (attempt {})", attempt);
                }
                CodeAllocation::Exhausted => {
                    return Err(AppError::capacity_exceeded(
                        "Failed to generate unique code",
                        json!({ "attempts": self.settings.max_code_attempts }),
                    ));
                }
            }
        }
    }

    /// Performs allocation attempt number `attempt` (0-based).
    ///
    /// Collisions are detected by the store's unique index on insert, so two
    /// concurrent creators can never both win the same code.
    pub async fn try_allocate(
        &self,
        target_url: &str,
        attempt: usize,
    ) -> Result<CodeAllocation, AppError> {
        if attempt >= self.settings.max_code_attempts {
            return Ok(CodeAllocation::Exhausted);
        }

        let new_mapping = NewMapping {
            short_code: generate_code(self.settings.code_length),
            target_url: target_url.to_string(),
        };

        match self.repository.create(new_mapping).await {
            Ok(mapping) => Ok(CodeAllocation::Allocated(mapping)),
            Err(AppError::Conflict { .. }) => Ok(CodeAllocation::Collision),
            Err(e) => Err(e),
        }
    }

    async fn resolve_from_store(&self, short_code: &str) -> Result<String, AppError> {
        let mapping = self
            .repository
            .find_by_code(short_code)
            .await?
            .ok_or_else(|| not_found(short_code))?;

        if mapping.expired {
            return Err(gone(short_code));
        }

        // The increment refuses expired rows, so a sweep landing between the
        // read above and this statement still yields Gone.
        let updated = self
            .repository
            .increment_clicks(short_code)
            .await?
            .ok_or_else(|| gone(short_code))?;

        self.warm(&updated).await;
        Ok(updated.target_url)
    }

    async fn count_cached_click(&self, short_code: &str) -> Result<(), AppError> {
        if let Err(e) = self.cache.increment_clicks(short_code).await {
            metrics::counter!("cache_errors_total").increment(1);
            warn!(
                "Cache counter increment failed for {}, counting in store: {}",
                short_code, e
            );
            self.repository.increment_clicks(short_code).await?;
        }
        Ok(())
    }

    async fn warm(&self, mapping: &Mapping) {
        if let Err(e) = self
            .cache
            .set_mapping(&mapping.snapshot(), Some(self.settings.cache_ttl_seconds))
            .await
        {
            metrics::counter!("cache_errors_total").increment(1);
            warn!("Failed to cache {}: {}", mapping.short_code, e);
        }
    }

    fn emit(&self, short_code: &str, context: ClickContext) {
        let event = ClickEvent::new(short_code.to_string(), context);

        match self.click_sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                metrics::counter!("analytics_dropped_total").increment(1);
                debug!("Analytics queue full, dropping click for {}", short_code);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Analytics queue closed, dropping click for {}", short_code);
            }
        }
    }
}

fn not_found(short_code: &str) -> AppError {
    AppError::not_found("Short link not found", json!({ "code": short_code }))
}

fn gone(short_code: &str) -> AppError {
    AppError::gone("Short link has expired", json!({ "code": short_code }))
}
