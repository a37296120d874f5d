//! Application layer services implementing business logic.
//!
//! This layer coordinates the cache and the durable store. Services consume
//! the [`crate::domain::repositories::MappingRepository`] and
//! [`crate::infrastructure::cache::CacheService`] traits and provide a clean
//! API for HTTP handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::ResolverService`] - Link creation, resolution and statistics
//! - [`services::Reconciler`] - Flushes cached click counters into the store
//! - [`services::Sweeper`] - Expires mappings past the retention window
//! - [`scheduler`] - Periodic jobs driving the reconciler and the sweeper

pub mod scheduler;
pub mod services;
