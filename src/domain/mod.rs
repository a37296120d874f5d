//! Domain layer containing business entities and contracts.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click metadata and analytics event model
//! - [`analytics`] - Analytics sink contract
//! - [`analytics_worker`] - Background analytics dispatcher
//!
//! # Click Processing Flow
//!
//! 1. [`crate::application::services::ResolverService`] resolves a short code
//! 2. The click is counted (cache counter on hit, durable count on miss)
//! 3. A [`click_event::ClickEvent`] is pushed to a bounded channel
//! 4. [`analytics_worker::run_analytics_dispatcher`] delivers it to an
//!    [`analytics::AnalyticsSink`] with a per-event timeout

pub mod analytics;
pub mod analytics_worker;
pub mod click_event;
pub mod entities;
pub mod repositories;
