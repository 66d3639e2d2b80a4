//! Planner error types
//!
//! Error codes:
//! - TQ_PLAN_UNKNOWN_COLUMN (REJECT)
//! - TQ_PLAN_TYPE_MISMATCH (REJECT)
//! - TQ_PLAN_MALFORMED (REJECT)
//! - TQ_PLAN_UNRESOLVABLE (ERROR)
//! - TQ_PLAN_SERVICE_UNAVAILABLE (ERROR)
//!
//! REJECT errors come from validating a parsed plan and are fed back to
//! the model once. ERROR errors end planning.

use std::fmt;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The model produced a plan that cannot run
    Reject,
    /// Planning could not complete
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Planner error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningErrorCode {
    /// Plan references a column or dataset that does not exist
    UnknownColumn,
    /// Argument incompatible with the column's type
    TypeMismatch,
    /// Plan structure is not executable
    MalformedPlan,
    /// Model never produced a parseable plan
    Unresolvable,
    /// Model unreachable or refusing requests
    ServiceUnavailable,
}

impl PlanningErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            PlanningErrorCode::UnknownColumn => "TQ_PLAN_UNKNOWN_COLUMN",
            PlanningErrorCode::TypeMismatch => "TQ_PLAN_TYPE_MISMATCH",
            PlanningErrorCode::MalformedPlan => "TQ_PLAN_MALFORMED",
            PlanningErrorCode::Unresolvable => "TQ_PLAN_UNRESOLVABLE",
            PlanningErrorCode::ServiceUnavailable => "TQ_PLAN_SERVICE_UNAVAILABLE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            PlanningErrorCode::UnknownColumn
            | PlanningErrorCode::TypeMismatch
            | PlanningErrorCode::MalformedPlan => Severity::Reject,
            PlanningErrorCode::Unresolvable | PlanningErrorCode::ServiceUnavailable => {
                Severity::Error
            }
        }
    }
}

impl fmt::Display for PlanningErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningError {
    code: PlanningErrorCode,
    message: String,
    /// Column (or dataset) the error is about, if any
    column: Option<String>,
}

impl PlanningError {
    /// Create an unknown column error
    pub fn unknown_column(column: impl Into<String>, available: &[String]) -> Self {
        let c = column.into();
        Self {
            code: PlanningErrorCode::UnknownColumn,
            message: format!(
                "Column '{}' does not exist (available: {})",
                c,
                available.join(", ")
            ),
            column: Some(c),
        }
    }

    /// Create an unknown dataset error (reported under the unknown column code)
    pub fn unknown_dataset(dataset: impl Into<String>, available: &[String]) -> Self {
        let d = dataset.into();
        Self {
            code: PlanningErrorCode::UnknownColumn,
            message: format!(
                "Dataset '{}' does not exist (available: {})",
                d,
                available.join(", ")
            ),
            column: Some(d),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(column: impl Into<String>, reason: impl Into<String>) -> Self {
        let c = column.into();
        Self {
            code: PlanningErrorCode::TypeMismatch,
            message: format!("Column '{}': {}", c, reason.into()),
            column: Some(c),
        }
    }

    /// Create a malformed plan error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            code: PlanningErrorCode::MalformedPlan,
            message: reason.into(),
            column: None,
        }
    }

    /// Create an unresolvable error
    pub fn unresolvable(attempts: u32, last_problem: impl Into<String>) -> Self {
        Self {
            code: PlanningErrorCode::Unresolvable,
            message: format!(
                "No usable plan after {} attempts: {}",
                attempts,
                last_problem.into()
            ),
            column: None,
        }
    }

    /// Create a service unavailable error
    pub fn service_unavailable(reason: impl Into<String>) -> Self {
        Self {
            code: PlanningErrorCode::ServiceUnavailable,
            message: reason.into(),
            column: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlanningErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the column name if applicable
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// True for errors found while validating a parsed plan
    pub fn is_validation(&self) -> bool {
        self.severity() == Severity::Reject
    }
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlanningError {}

/// Result type for planner operations
pub type PlanningResult<T> = Result<T, PlanningError>;
