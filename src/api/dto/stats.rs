//! DTOs for link statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::MappingStats;

/// Statistics for a specific short link.
///
/// `clicks` includes clicks not yet reconciled into the durable store.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub target_url: String,
    pub short_code: String,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
    pub expired: bool,
}

impl From<MappingStats> for StatsResponse {
    fn from(stats: MappingStats) -> Self {
        Self {
            target_url: stats.target_url,
            short_code: stats.short_code,
            clicks: stats.clicks,
            created_at: stats.created_at,
            expired: stats.expired,
        }
    }
}
