//! Repository trait for mapping persistence.

use crate::domain::entities::{Mapping, NewMapping};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for the durable mapping store.
///
/// Every click mutation is a single atomic statement on the store side; no
/// method performs a read-modify-write in application code.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgMappingRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Inserts a new mapping with zero clicks.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the short code already exists.
    /// Returns [`AppError::Store`] if the store is unreachable.
    async fn create(&self, new_mapping: NewMapping) -> Result<Mapping, AppError>;

    /// Finds a mapping by short code, expired or not.
    async fn find_by_code(&self, short_code: &str) -> Result<Option<Mapping>, AppError>;

    /// Atomically increments the click count of a non-expired mapping by one.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Mapping))` with the post-increment count
    /// - `Ok(None)` if the mapping is absent or expired
    async fn increment_clicks(&self, short_code: &str) -> Result<Option<Mapping>, AppError>;

    /// Atomically adds `delta` clicks, regardless of the expired flag.
    ///
    /// Returns `Ok(false)` if no mapping has this code.
    async fn add_clicks(&self, short_code: &str, delta: i64) -> Result<bool, AppError>;

    /// Lists non-expired mappings created before `cutoff`, oldest first.
    async fn find_expirable(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Mapping>, AppError>;

    /// Counts non-expired mappings created before `cutoff`.
    async fn count_expirable(&self, cutoff: DateTime<Utc>) -> Result<i64, AppError>;

    /// Flags a mapping expired. One-way: already expired rows are untouched.
    ///
    /// Returns `Ok(true)` if this call performed the transition.
    async fn mark_expired(&self, short_code: &str) -> Result<bool, AppError>;

    /// Cheap connectivity probe used by health checks.
    async fn ping(&self) -> Result<(), AppError>;
}
