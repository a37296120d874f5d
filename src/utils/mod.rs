//! Utility functions for code generation and URL processing.
//!
//! - [`code_generator`] - Short code generation and validation
//! - [`url_normalizer`] - Target URL validation and normalization
//! - [`request_meta`] - Click metadata extraction from HTTP headers

pub mod code_generator;
pub mod request_meta;
pub mod url_normalizer;
