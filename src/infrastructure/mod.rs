//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for persistence, caching and analytics delivery.
//!
//! # Modules
//!
//! - [`analytics`] - Analytics sinks (HTTP and log-only)
//! - [`cache`] - Caching abstractions (Redis, in-memory and no-op implementations)
//! - [`persistence`] - PostgreSQL repository implementations
//! - [`remote_trigger`] - HTTP client for `POST /api/reconcile` on a running instance

pub mod analytics;
pub mod cache;
pub mod persistence;
pub mod remote_trigger;
