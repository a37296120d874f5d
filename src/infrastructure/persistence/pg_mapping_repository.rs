//! PostgreSQL implementation of the mapping repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Mapping, NewMapping};
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;

/// PostgreSQL repository for the `urls` table.
///
/// Click mutations are single `UPDATE ... SET clicks = clicks + n` statements,
/// so concurrent callers never lose increments.
pub struct PgMappingRepository {
    pool: Arc<PgPool>,
}

impl PgMappingRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for PgMappingRepository {
    async fn create(&self, new_mapping: NewMapping) -> Result<Mapping, AppError> {
        let mapping = sqlx::query_as::<_, Mapping>(
            r#"
            INSERT INTO urls (short_code, target_url)
            VALUES ($1, $2)
            RETURNING id, short_code, target_url, clicks, created_at, expired
            "#,
        )
        .bind(&new_mapping.short_code)
        .bind(&new_mapping.target_url)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(mapping)
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<Mapping>, AppError> {
        let mapping = sqlx::query_as::<_, Mapping>(
            r#"
            SELECT id, short_code, target_url, clicks, created_at, expired
            FROM urls
            WHERE short_code = $1
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(mapping)
    }

    async fn increment_clicks(&self, short_code: &str) -> Result<Option<Mapping>, AppError> {
        let mapping = sqlx::query_as::<_, Mapping>(
            r#"
            UPDATE urls
            SET clicks = clicks + 1, updated_at = NOW()
            WHERE short_code = $1 AND expired = FALSE
            RETURNING id, short_code, target_url, clicks, created_at, expired
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(mapping)
    }

    async fn add_clicks(&self, short_code: &str, delta: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE urls
            SET clicks = clicks + $2, updated_at = NOW()
            WHERE short_code = $1
            "#,
        )
        .bind(short_code)
        .bind(delta)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_expirable(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Mapping>, AppError> {
        let rows = sqlx::query_as::<_, Mapping>(
            r#"
            SELECT id, short_code, target_url, clicks, created_at, expired
            FROM urls
            WHERE expired = FALSE AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn count_expirable(&self, cutoff: DateTime<Utc>) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM urls WHERE expired = FALSE AND created_at < $1",
        )
        .bind(cutoff)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn mark_expired(&self, short_code: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE urls
            SET expired = TRUE, updated_at = NOW()
            WHERE short_code = $1 AND expired = FALSE
            "#,
        )
        .bind(short_code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
