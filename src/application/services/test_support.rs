//! Store fake whose click writes take a configurable time.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::entities::{Mapping, NewMapping};
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;

pub struct SlowStore {
    rows: Mutex<HashMap<String, Mapping>>,
    write_delay: Duration,
}

impl SlowStore {
    pub fn new(write_delay: Duration) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            write_delay,
        }
    }

    pub fn insert(&self, code: &str, created_at: DateTime<Utc>) {
        let mapping = Mapping::new(
            1,
            code.to_string(),
            "https://example.com/".to_string(),
            0,
            created_at,
            false,
        );
        self.rows.lock().unwrap().insert(code.to_string(), mapping);
    }

    pub fn get(&self, code: &str) -> Option<Mapping> {
        self.rows.lock().unwrap().get(code).cloned()
    }

    pub fn clicks(&self, code: &str) -> i64 {
        self.get(code).map(|m| m.clicks).unwrap_or(0)
    }
}

#[async_trait]
impl MappingRepository for SlowStore {
    async fn create(&self, _new_mapping: NewMapping) -> Result<Mapping, AppError> {
        Err(AppError::internal("not supported", json!({})))
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<Mapping>, AppError> {
        Ok(self.get(short_code))
    }

    async fn increment_clicks(&self, _short_code: &str) -> Result<Option<Mapping>, AppError> {
        Err(AppError::internal("not supported", json!({})))
    }

    async fn add_clicks(&self, short_code: &str, delta: i64) -> Result<bool, AppError> {
        tokio::time::sleep(self.write_delay).await;

        let mut rows = self.rows.lock().unwrap();
        Ok(rows
            .get_mut(short_code)
            .map(|m| m.clicks += delta)
            .is_some())
    }

    async fn find_expirable(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Mapping>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|m| !m.expired && m.created_at < cutoff)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_expirable(&self, cutoff: DateTime<Utc>) -> Result<i64, AppError> {
        Ok(self.find_expirable(cutoff, i64::MAX).await?.len() as i64)
    }

    async fn mark_expired(&self, short_code: &str) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(match rows.get_mut(short_code) {
            Some(m) if !m.expired => {
                m.expired = true;
                true
            }
            _ => false,
        })
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
