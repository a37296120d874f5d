//! Short code generation and validation utilities.

use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default length of generated codes.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Longest code accepted on the resolve path (matches the column width).
pub const MAX_CODE_LENGTH: usize = 32;

static CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,32}$").expect("valid code regex"));

/// Generates a random alphanumeric code of `length` characters.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code(6);
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();

    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Returns true if `code` could have been issued by this service.
///
/// Anything else is rejected before touching the cache or the store.
pub fn is_valid_code(code: &str) -> bool {
    CODE_REGEX.is_match(code)
}
