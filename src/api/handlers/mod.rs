//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod health;
pub mod jobs;
pub mod redirect;
pub mod shorten;
pub mod stats;

pub use health::health_handler;
pub use jobs::{reconcile_handler, sweep_handler};
pub use redirect::redirect_handler;
pub use shorten::create_url_handler;
pub use stats::stats_handler;
