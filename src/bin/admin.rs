//! CLI administration tool for shortcache.
//!
//! Runs the background jobs on demand, inspects link statistics and checks
//! the database, without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Flush cached click counters into the database
//! cargo run --bin admin -- reconcile
//!
//! # Ask a running instance to reconcile (retries while it is unreachable)
//! cargo run --bin admin -- reconcile --api-url http://localhost:3000
//!
//! # Expire mappings past the retention window
//! cargo run --bin admin -- sweep
//!
//! # Show merged statistics for a link
//! cargo run --bin admin -- stats Ab12Cd
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server (see [`shortcache::config`]). `DATABASE_URL` is
//! required except for `reconcile --api-url`.

use shortcache::application::scheduler::RetryPolicy;
use shortcache::config::{self, CacheBackend, Config};
use shortcache::domain::repositories::MappingRepository;
use shortcache::infrastructure::persistence::PgMappingRepository;
use shortcache::infrastructure::remote_trigger::RemoteReconcileClient;
use shortcache::server::{build_cache, build_state, connect_pool};
use shortcache::state::AppState;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// CLI tool for managing shortcache.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Flush cached click counters into the database
    Reconcile {
        /// Trigger the run on a running instance instead of locally
        #[arg(long)]
        api_url: Option<String>,
    },

    /// Expire mappings older than the retention window
    Sweep {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show merged statistics for a short link
    Stats {
        /// Short code
        code: String,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Commands::Reconcile {
        api_url: Some(api_url),
    } = &cli.command
    {
        return reconcile_remote(api_url, remote_retry_policy()).await;
    }

    let config = config::load_from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Reconcile { .. } => reconcile_local(&config).await?,
        Commands::Sweep { yes } => sweep(&config, yes).await?,
        Commands::Stats { code } => stats(&config, &code).await?,
        Commands::Db { action } => handle_db_action(&config, action).await?,
    }

    Ok(())
}

/// Builds the same services the server runs, against the configured backends.
async fn local_state(config: &Config) -> Result<AppState> {
    let pool = connect_pool(config).await?;
    let repository: Arc<dyn MappingRepository> =
        Arc::new(PgMappingRepository::new(Arc::new(pool)));
    let cache = build_cache(config).await;

    // Nothing resolves through the CLI, so no analytics consumer is needed.
    let (click_tx, _click_rx) = mpsc::channel(1);

    Ok(build_state(config, repository, cache, click_tx))
}

/// Reads the retry policy without requiring the full server configuration.
fn remote_retry_policy() -> RetryPolicy {
    let defaults = RetryPolicy::default();
    let attempts = std::env::var("RECONCILE_RETRY_ATTEMPTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.attempts);
    let backoff = std::env::var("RECONCILE_RETRY_BACKOFF_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(defaults.backoff);

    RetryPolicy { attempts, backoff }
}

/// Triggers reconciliation on a running instance with bounded retries.
async fn reconcile_remote(api_url: &str, retry: RetryPolicy) -> Result<()> {
    let client = RemoteReconcileClient::new(api_url, Duration::from_secs(30))
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!(
        "{} {}",
        "🔄 Triggering reconciliation at".bright_blue().bold(),
        client.endpoint().cyan()
    );

    let report = retry
        .run("Remote reconciliation", || client.trigger())
        .await
        .map_err(|e| anyhow::anyhow!("Reconciliation failed after {} attempts: {}", retry.attempts, e))?;

    print_reconcile_report(&report);
    Ok(())
}

/// Runs reconciliation in this process.
async fn reconcile_local(config: &Config) -> Result<()> {
    if config.cache_backend == CacheBackend::Memory {
        println!(
            "{}",
            "⚠️  The in-memory cache lives inside the server process; use --api-url to reconcile it."
                .yellow()
        );
        return Ok(());
    }

    println!("{}", "🔄 Reconciling click counters".bright_blue().bold());

    let state = local_state(config).await?;
    let report = state
        .reconciler
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Reconciliation failed: {}", e))?;

    print_reconcile_report(&report);
    Ok(())
}

fn print_reconcile_report(report: &shortcache::application::services::ReconcileReport) {
    println!();
    if report.skipped {
        println!("{}", "⏭  Another run is in progress, skipped".yellow());
        println!();
        return;
    }

    println!("  Counters scanned: {}", report.scanned.to_string().bright_white());
    println!("  Counters flushed: {}", report.flushed.to_string().bright_green().bold());
    println!("  Clicks moved:     {}", report.clicks.to_string().bright_green().bold());
    if report.failed > 0 {
        println!("  Failed:           {}", report.failed.to_string().red().bold());
    }
    println!();
}

/// Previews and runs an expiry sweep with a confirmation prompt.
async fn sweep(config: &Config, skip_confirm: bool) -> Result<()> {
    println!("{}", "🧹 Expiry sweep".bright_blue().bold());
    println!();

    let state = local_state(config).await?;
    let now = Utc::now();

    let candidates = state
        .sweeper
        .preview(now)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;

    println!(
        "  Retention: {} days (cutoff {})",
        config.retention_days.to_string().bright_white(),
        state
            .sweeper
            .cutoff(now)
            .format("%Y-%m-%d %H:%M UTC")
            .to_string()
            .bright_black()
    );
    println!("  Mappings to expire: {}", candidates.to_string().bright_white().bold());
    println!();

    if candidates == 0 {
        println!("{}", "✅ Nothing to expire".green());
        return Ok(());
    }

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt(format!("Expire {} mappings?", candidates))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let report = state
        .sweeper
        .run_at(now)
        .await
        .map_err(|e| anyhow::anyhow!("Sweep failed: {}", e))?;

    println!();
    if report.skipped {
        println!("{}", "⏭  Another sweep is in progress, skipped".yellow());
    } else {
        println!(
            "{} {}",
            "✅ Expired".green().bold(),
            report.expired.to_string().bright_green().bold()
        );
        if report.cache_failures > 0 {
            println!(
                "{}",
                format!(
                    "⚠️  {} cache entries could not be purged; they lapse with their TTL",
                    report.cache_failures
                )
                .yellow()
            );
        }
    }
    println!();

    Ok(())
}

/// Displays merged statistics for one link.
async fn stats(config: &Config, code: &str) -> Result<()> {
    let state = local_state(config).await?;

    let stats = state
        .resolver
        .stats(code)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();
    println!("  Code:    {}", stats.short_code.cyan());
    println!("  Target:  {}", stats.target_url.bright_white());
    println!("  Clicks:  {}", stats.clicks.to_string().bright_green().bold());
    println!(
        "  Created: {}",
        stats
            .created_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .bright_black()
    );
    println!(
        "  Status:  {}",
        if stats.expired {
            "EXPIRED".red()
        } else {
            "ACTIVE".green()
        }
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(config: &Config, action: DbAction) -> Result<()> {
    let pool = connect_pool(config).await?;

    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(&pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(&pool)
                .await?;

            let (total, expired, clicks): (i64, i64, Option<i64>) = sqlx::query_as(
                "SELECT COUNT(*), COUNT(*) FILTER (WHERE expired), SUM(clicks)::BIGINT FROM urls",
            )
            .fetch_one(&pool)
            .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Mappings:   {}", total.to_string().bright_green().bold());
            println!("  Expired:    {}", expired.to_string().bright_black());
            println!(
                "  Clicks:     {}",
                clicks.unwrap_or(0).to_string().bright_green().bold()
            );
            println!();
        }
    }

    Ok(())
}
