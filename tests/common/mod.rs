#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tower::Layer;

use shortcache::application::services::{Reconciler, ResolverService, ResolverSettings, Sweeper};
use shortcache::domain::click_event::ClickEvent;
use shortcache::domain::entities::{Mapping, NewMapping};
use shortcache::domain::repositories::MappingRepository;
use shortcache::error::AppError;
use shortcache::infrastructure::cache::CacheService;
use shortcache::state::AppState;

pub const RETENTION_DAYS: u32 = 30;

/// `MappingRepository` over a `HashMap`, with a switch to make writes fail.
#[derive(Default)]
pub struct InMemoryMappingRepository {
    rows: Mutex<HashMap<String, Mapping>>,
    next_id: AtomicI64,
    fail_writes: AtomicBool,
}

impl InMemoryMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every mutating call fail with a transient store error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Inserts a mapping with an explicit creation time.
    pub fn insert_at(&self, code: &str, target_url: &str, created_at: DateTime<Utc>) -> Mapping {
        let mapping = Mapping::new(
            self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            code.to_string(),
            target_url.to_string(),
            0,
            created_at,
            false,
        );
        self.rows
            .lock()
            .unwrap()
            .insert(code.to_string(), mapping.clone());
        mapping
    }

    /// Inserts a mapping created `age_days` ago.
    pub fn insert_aged(&self, code: &str, target_url: &str, age_days: i64) -> Mapping {
        self.insert_at(code, target_url, Utc::now() - Duration::days(age_days))
    }

    pub fn get(&self, code: &str) -> Option<Mapping> {
        self.rows.lock().unwrap().get(code).cloned()
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("Database unavailable", json!({})));
        }
        Ok(())
    }
}

#[async_trait]
impl MappingRepository for InMemoryMappingRepository {
    async fn create(&self, new_mapping: NewMapping) -> Result<Mapping, AppError> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();

        if rows.contains_key(&new_mapping.short_code) {
            return Err(AppError::conflict("Unique constraint violation", json!({})));
        }

        let mapping = Mapping::new(
            self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            new_mapping.short_code.clone(),
            new_mapping.target_url,
            0,
            Utc::now(),
            false,
        );
        rows.insert(new_mapping.short_code, mapping.clone());
        Ok(mapping)
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<Mapping>, AppError> {
        Ok(self.get(short_code))
    }

    async fn increment_clicks(&self, short_code: &str) -> Result<Option<Mapping>, AppError> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();

        Ok(rows
            .get_mut(short_code)
            .filter(|m| !m.expired)
            .map(|m| {
                m.clicks += 1;
                m.clone()
            }))
    }

    async fn add_clicks(&self, short_code: &str, delta: i64) -> Result<bool, AppError> {
        self.check_writable()?;
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
        let mut matches: Vec<Mapping> = rows
            .values()
            .filter(|m| !m.expired && m.created_at < cutoff)
            .cloned()
            .collect();
        matches.sort_by_key(|m| m.created_at);
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn count_expirable(&self, cutoff: DateTime<Utc>) -> Result<i64, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|m| !m.expired && m.created_at < cutoff)
            .count() as i64)
    }

    async fn mark_expired(&self, short_code: &str) -> Result<bool, AppError> {
        self.check_writable()?;
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

/// Builds application state over the given repository and cache.
pub fn create_test_state(
    repository: Arc<InMemoryMappingRepository>,
    cache: Arc<dyn CacheService>,
) -> (AppState, mpsc::Receiver<ClickEvent>) {
    let (tx, rx) = mpsc::channel(1000);
    let repository: Arc<dyn MappingRepository> = repository;

    let resolver = Arc::new(ResolverService::new(
        repository.clone(),
        cache.clone(),
        tx.clone(),
        ResolverSettings::default(),
    ));
    let reconciler = Arc::new(Reconciler::new(repository.clone(), cache.clone()));
    let sweeper = Arc::new(Sweeper::new(
        repository.clone(),
        cache.clone(),
        RETENTION_DAYS,
        100,
    ));

    let state = AppState {
        resolver,
        reconciler,
        sweeper,
        repository,
        cache,
        click_sender: tx,
        behind_proxy: false,
    };

    (state, rx)
}

/// Injects a fixed peer address so `ConnectInfo` extraction succeeds in tests.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
