//! Analytics sink implementations.
//!
//! - [`HttpAnalyticsSink`] - Delivers click events to the analytics service over HTTP
//! - [`LogAnalyticsSink`] - Logs click events when no analytics service is configured

mod http_sink;
mod log_sink;

pub use http_sink::HttpAnalyticsSink;
pub use log_sink::LogAnalyticsSink;
