//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache backend selection, the analytics
//! dispatcher, the job schedules and the Axum server lifecycle.

use crate::application::scheduler::{drain_on_shutdown, spawn_reconcile_job, spawn_sweep_job};
use crate::application::services::{Reconciler, ResolverService, Sweeper};
use crate::config::{CacheBackend, Config};
use crate::domain::analytics::AnalyticsSink;
use crate::domain::analytics_worker::run_analytics_dispatcher;
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::MappingRepository;
use crate::infrastructure::analytics::{HttpAnalyticsSink, LogAnalyticsSink};
use crate::infrastructure::cache::{CacheService, MemoryCache, NullCache, RedisCache};
use crate::infrastructure::persistence::PgMappingRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Upper bound on the final counter flush during shutdown.
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the PostgreSQL pool with the configured limits.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn connect_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");
    Ok(pool)
}

/// Builds the configured cache backend.
///
/// A Redis backend that cannot be reached at startup degrades to
/// [`NullCache`]; every read then falls through to the store.
pub async fn build_cache(config: &Config) -> Arc<dyn CacheService> {
    match (config.cache_backend, &config.redis_url) {
        (CacheBackend::Redis, Some(redis_url)) => {
            match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
                Ok(redis) => {
                    tracing::info!("Cache enabled (Redis)");
                    Arc::new(redis)
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                    Arc::new(NullCache::new())
                }
            }
        }
        (CacheBackend::Memory, _) => {
            tracing::info!("Cache enabled (in-memory)");
            Arc::new(MemoryCache::new(config.cache_ttl_seconds))
        }
        _ => {
            tracing::info!("Cache disabled (NullCache)");
            Arc::new(NullCache::new())
        }
    }
}

/// Builds the analytics sink: HTTP when `ANALYTICS_URL` is set, log-only otherwise.
pub fn build_analytics_sink(config: &Config) -> Arc<dyn AnalyticsSink> {
    let Some(base_url) = &config.analytics_url else {
        tracing::info!("Analytics: log only");
        return Arc::new(LogAnalyticsSink);
    };

    match HttpAnalyticsSink::new(base_url, Duration::from_millis(config.analytics_timeout_ms)) {
        Ok(sink) => {
            tracing::info!("Analytics: {}", sink.endpoint());
            Arc::new(sink)
        }
        Err(e) => {
            tracing::warn!("Failed to build analytics client: {}. Logging events instead.", e);
            Arc::new(LogAnalyticsSink)
        }
    }
}

/// Wires the services around a repository and a cache.
pub fn build_state(
    config: &Config,
    repository: Arc<dyn MappingRepository>,
    cache: Arc<dyn CacheService>,
    click_sender: mpsc::Sender<ClickEvent>,
) -> AppState {
    let resolver = Arc::new(ResolverService::new(
        repository.clone(),
        cache.clone(),
        click_sender.clone(),
        config.resolver_settings(),
    ));
    let reconciler = Arc::new(Reconciler::new(repository.clone(), cache.clone()));
    let sweeper = Arc::new(Sweeper::new(
        repository.clone(),
        cache.clone(),
        config.retention_days,
        config.sweep_batch_size,
    ));

    AppState {
        resolver,
        reconciler,
        sweeper,
        repository,
        cache,
        click_sender,
        behind_proxy: config.behind_proxy,
    }
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Cache backend (Redis, in-memory, or NullCache)
/// - Analytics dispatcher
/// - Reconciliation and sweep schedules
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_pool(&config).await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache = build_cache(&config).await;
    let repository: Arc<dyn MappingRepository> =
        Arc::new(PgMappingRepository::new(Arc::new(pool)));

    let (click_tx, click_rx) = mpsc::channel(config.analytics_queue_capacity);
    tokio::spawn(run_analytics_dispatcher(
        click_rx,
        build_analytics_sink(&config),
        config.analytics_concurrency,
        Duration::from_millis(config.analytics_timeout_ms),
    ));
    tracing::info!("Analytics dispatcher started");

    let state = build_state(&config, repository, cache, click_tx);

    let reconcile_job = spawn_reconcile_job(
        state.reconciler.clone(),
        Duration::from_secs(config.reconcile_interval_secs),
        config.reconcile_retry(),
    );
    let sweep_job = spawn_sweep_job(
        state.sweeper.clone(),
        Duration::from_secs(config.sweep_interval_secs),
        config.sweep_at,
    );

    let reconciler = state.reconciler.clone();
    let sweeper = state.sweeper.clone();
    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    drain_on_shutdown(
        vec![reconcile_job, sweep_job],
        &reconciler,
        &sweeper,
        SHUTDOWN_FLUSH_TIMEOUT,
    )
    .await;

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
