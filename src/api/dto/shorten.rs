//! DTOs for the link creation endpoint.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::Mapping;

/// Request to shorten a URL.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUrlRequest {
    /// The target URL. Scheme, host and length are checked again when it is
    /// normalized.
    #[validate(url(message = "Invalid URL format"))]
    pub target_url: String,
}

/// A created short link.
#[derive(Debug, Serialize)]
pub struct UrlResponse {
    pub target_url: String,
    pub short_code: String,
    pub clicks: i64,
}

impl From<Mapping> for UrlResponse {
    fn from(mapping: Mapping) -> Self {
        Self {
            target_url: mapping.target_url,
            short_code: mapping.short_code,
            clicks: mapping.clicks,
        }
    }
}
