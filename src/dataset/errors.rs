//! # Dataset Load Errors

use thiserror::Error;

use crate::blob::BlobError;

/// Result type for load operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Dataset load errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Blob missing or unreadable
    #[error("Dataset source not found: {0}")]
    NotFound(String),

    /// Bytes are not a readable table
    #[error("Could not parse {location}: {reason}")]
    ParseFailure { location: String, reason: String },

    /// Transient storage failures outlasted the retry budget
    #[error("Storage unavailable after {attempts} attempts reading {location}: {reason}")]
    Unavailable {
        location: String,
        attempts: u32,
        reason: String,
    },

    /// Permanent storage failure (auth, bad path, I/O)
    #[error("Storage error for {location}: {reason}")]
    Storage { location: String, reason: String },

    /// Dataset names must be usable inside prompts and plans
    #[error("Invalid dataset name '{0}': use letters, digits, '_' or '-'")]
    InvalidName(String),
}

impl LoadError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::NotFound(_) => "TQ_LOAD_NOT_FOUND",
            LoadError::ParseFailure { .. } => "TQ_LOAD_PARSE_FAILURE",
            LoadError::Unavailable { .. } => "TQ_LOAD_UNAVAILABLE",
            LoadError::Storage { .. } => "TQ_LOAD_STORAGE",
            LoadError::InvalidName(_) => "TQ_LOAD_INVALID_NAME",
        }
    }

    pub(crate) fn from_blob(location: &str, error: BlobError) -> Self {
        match error {
            BlobError::NotFound(_) => LoadError::NotFound(location.to_string()),
            other => LoadError::Storage {
                location: location.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_not_found_maps_to_not_found() {
        let err = LoadError::from_blob("sales.csv", BlobError::NotFound("sales.csv".into()));
        assert_eq!(err, LoadError::NotFound("sales.csv".into()));
        assert_eq!(err.code(), "TQ_LOAD_NOT_FOUND");
    }

    #[test]
    fn test_other_blob_errors_are_storage() {
        let err = LoadError::from_blob("sales.csv", BlobError::Unauthorized("sig".into()));
        assert_eq!(err.code(), "TQ_LOAD_STORAGE");
    }
}
