//! # Engine Errors
//!
//! One error type for everything `QueryEngine` can report. It is `Clone`
//! so a single failed computation can be handed to every waiting caller.

use thiserror::Error;

use crate::dataset::LoadError;
use crate::executor::ExecutionError;
use crate::llm::ModelError;
use crate::planner::{PlanningError, PlanningErrorCode};

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Any failure surfaced by the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("No datasets are loaded")]
    NoDatasets,

    #[error("Dataset '{0}' is not loaded")]
    UnknownDataset(String),

    /// A direct model request (sentiment analysis) failed
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable error code
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Load(e) => e.code(),
            EngineError::Planning(e) => e.code().code(),
            EngineError::Execution(e) => e.code().code(),
            EngineError::NoDatasets => "TQ_NO_DATASETS",
            EngineError::UnknownDataset(_) => "TQ_UNKNOWN_DATASET",
            EngineError::Model(_) => "TQ_MODEL_FAILED",
            EngineError::InvalidRequest(_) => "TQ_INVALID_REQUEST",
            EngineError::Internal(_) => "TQ_INTERNAL",
        }
    }

    /// Message safe to show an end user. Storage and model transport
    /// details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Load(LoadError::NotFound(location)) => {
                format!("Dataset source '{}' was not found.", location)
            }
            EngineError::Load(LoadError::ParseFailure { location, reason }) => {
                format!("'{}' could not be read as a table: {}", location, reason)
            }
            EngineError::Load(LoadError::Unavailable { .. }) => {
                "Storage is temporarily unavailable. Please try again.".to_string()
            }
            EngineError::Load(LoadError::Storage { location, .. }) => {
                format!("'{}' could not be read from storage.", location)
            }
            EngineError::Load(e @ LoadError::InvalidName(_)) => e.to_string(),
            EngineError::Planning(e) => match e.code() {
                PlanningErrorCode::Unresolvable => {
                    "The question could not be understood. Try rephrasing it.".to_string()
                }
                PlanningErrorCode::ServiceUnavailable => {
                    "The language model is unavailable right now. Please try again later."
                        .to_string()
                }
                _ => format!(
                    "The question could not be turned into a valid query: {}",
                    e.message()
                ),
            },
            EngineError::Execution(e) => format!("The query failed: {}", e.message()),
            EngineError::NoDatasets => {
                "Load at least one dataset before asking questions.".to_string()
            }
            EngineError::UnknownDataset(name) => format!("Dataset '{}' is not loaded.", name),
            EngineError::Model(_) => {
                "The language model could not complete the request. Please try again later."
                    .to_string()
            }
            EngineError::InvalidRequest(reason) => reason.clone(),
            EngineError::Internal(_) => "An internal error occurred.".to_string(),
        }
    }
}
