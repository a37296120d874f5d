//! Mapping entity: the durable association of a short code to a target URL.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A short code mapping as stored in the durable store.
///
/// `short_code` and `target_url` never change after creation. `clicks` only
/// grows, and `expired` only ever flips from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Mapping {
    pub id: i64,
    pub short_code: String,
    pub target_url: String,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
    pub expired: bool,
}

impl Mapping {
    /// Creates a new Mapping instance.
    pub fn new(
        id: i64,
        short_code: String,
        target_url: String,
        clicks: i64,
        created_at: DateTime<Utc>,
        expired: bool,
    ) -> Self {
        Self {
            id,
            short_code,
            target_url,
            clicks,
            created_at,
            expired,
        }
    }

    /// Returns true if the mapping was created before `now - retention`.
    pub fn is_older_than(&self, retention: Duration, now: DateTime<Utc>) -> bool {
        self.created_at < now - retention
    }

    /// Builds the cache snapshot for this mapping.
    pub fn snapshot(&self) -> CachedMapping {
        CachedMapping {
            target_url: self.target_url.clone(),
            short_code: self.short_code.clone(),
            clicks: self.clicks,
        }
    }
}

/// Input data for persisting a new mapping.
#[derive(Debug, Clone)]
pub struct NewMapping {
    pub short_code: String,
    pub target_url: String,
}

/// Cache-resident copy of a mapping.
///
/// Derived and disposable: `clicks` is the durable count at the time the
/// snapshot was written and is never read back as authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMapping {
    pub target_url: String,
    pub short_code: String,
    pub clicks: i64,
}

/// Click statistics merged from the durable count and the pending cache delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingStats {
    pub short_code: String,
    pub target_url: String,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
    pub expired: bool,
}
