use crate::error::Result;
use std::time::Duration;

/// Maximum length of a response body kept in logs and errors.
pub const MAX_BODY_LENGTH: usize = 500;

/// Per-request timeout used when a channel config does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub(crate) fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// HTTP client whose requests give up after `timeout_secs`.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Truncate a string to at most `max_len` bytes, snapping to a char boundary.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

/// Masks all but the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "***".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("***{tail}")
}
