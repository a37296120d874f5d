//! DTOs for on-demand job triggers.

use serde::Serialize;

/// Acknowledgement of a triggered job run.
#[derive(Debug, Serialize)]
pub struct JobResponse<T> {
    /// `completed`, or `skipped` if a run was already in progress.
    pub status: &'static str,
    pub report: T,
}

impl<T> JobResponse<T> {
    pub fn new(skipped: bool, report: T) -> Self {
        Self {
            status: if skipped { "skipped" } else { "completed" },
            report,
        }
    }
}
