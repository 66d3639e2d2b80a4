//! # Blob Store Errors

use thiserror::Error;

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Blob store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob path: {0}")]
    InvalidPath(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Timeouts, throttling, 5xx: worth retrying
    #[error("Transient storage failure: {0}")]
    Transient(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl BlobError {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, BlobError::Transient(_))
    }

    /// Classify an HTTP status returned by a blob endpoint
    pub fn from_status(status: u16, path: &str) -> Self {
        match status {
            404 => BlobError::NotFound(path.to_string()),
            401 | 403 => BlobError::Unauthorized(format!("status {} for {}", status, path)),
            408 | 429 | 500..=599 => {
                BlobError::Transient(format!("status {} for {}", status, path))
            }
            other => BlobError::Io(format!("unexpected status {} for {}", other, path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            BlobError::from_status(404, "a.csv"),
            BlobError::NotFound("a.csv".into())
        );
        assert!(BlobError::from_status(503, "a.csv").is_transient());
        assert!(BlobError::from_status(429, "a.csv").is_transient());
        assert!(!BlobError::from_status(403, "a.csv").is_transient());
        assert!(!BlobError::from_status(400, "a.csv").is_transient());
    }
}
