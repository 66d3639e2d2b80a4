//! # Language Model Errors

use thiserror::Error;

/// Result type for model calls
pub type ModelResult<T> = Result<T, ModelError>;

/// Why a completion request failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Model request timed out: {0}")]
    Timeout(String),

    #[error("Model rate limit reached: {0}")]
    RateLimited(String),

    /// 5xx or connection refused
    #[error("Model service unavailable: {0}")]
    Unavailable(String),

    /// Bad request, bad credentials, forbidden: retrying will not help
    #[error("Model rejected the request: {0}")]
    Rejected(String),

    /// Malformed response or other transport failure
    #[error("Model transport error: {0}")]
    Transport(String),
}

impl ModelError {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ModelError::Timeout(_) | ModelError::RateLimited(_) | ModelError::Unavailable(_)
        )
    }

    /// Classify a non-success HTTP status from a completion endpoint
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("status {}: {}", status, truncate(body, 200));
        match status {
            408 => ModelError::Timeout(detail),
            429 => ModelError::RateLimited(detail),
            500..=599 => ModelError::Unavailable(detail),
            _ => ModelError::Rejected(detail),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
