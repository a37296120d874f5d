//! Core domain entities.
//!
//! - [`Mapping`] - Durable short code to target URL mapping
//! - [`NewMapping`] - Input for creating a mapping
//! - [`CachedMapping`] - Cache-resident snapshot of a mapping
//! - [`MappingStats`] - Merged click statistics

pub mod mapping;

pub use mapping::{CachedMapping, Mapping, MappingStats, NewMapping};
