//! Business logic services for the application layer.

pub mod reconciler;
pub mod resolver_service;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod test_support;

pub use reconciler::{ReconcileReport, Reconciler};
pub use resolver_service::{CodeAllocation, ResolverService, ResolverSettings};
pub use sweeper::{DEFAULT_SWEEP_BATCH_SIZE, SweepReport, Sweeper};
