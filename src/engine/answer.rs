//! Answers

use serde::Serialize;
use uuid::Uuid;

use crate::executor::ExecutionResult;

/// The response to one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub request_id: Uuid,
    pub question: String,
    /// Result with its plan and provenance
    pub result: ExecutionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    /// Why the narrative is missing, when it was requested but failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative_error: Option<String>,
}
