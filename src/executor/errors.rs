//! Executor error types
//!
//! Error codes (all ERROR severity):
//! - TQ_EXEC_DIVISION_BY_ZERO
//! - TQ_EXEC_JOIN_KEY_MISMATCH
//! - TQ_EXEC_TYPE_COERCION
//! - TQ_EXEC_UNKNOWN_DATASET
//! - TQ_EXEC_UNKNOWN_COLUMN

use std::fmt;

/// Executor error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorCode {
    /// Ratio with a zero denominator
    DivisionByZero,
    /// Join key missing on a side, or key types that cannot be matched
    JoinKeyMismatch,
    /// Filter literal does not fit the column type
    TypeCoercionFailure,
    /// Plan names a dataset that is not loaded
    UnknownDataset,
    /// Plan names a column absent at that step
    UnknownColumn,
}

impl ExecutionErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionErrorCode::DivisionByZero => "TQ_EXEC_DIVISION_BY_ZERO",
            ExecutionErrorCode::JoinKeyMismatch => "TQ_EXEC_JOIN_KEY_MISMATCH",
            ExecutionErrorCode::TypeCoercionFailure => "TQ_EXEC_TYPE_COERCION",
            ExecutionErrorCode::UnknownDataset => "TQ_EXEC_UNKNOWN_DATASET",
            ExecutionErrorCode::UnknownColumn => "TQ_EXEC_UNKNOWN_COLUMN",
        }
    }
}

impl fmt::Display for ExecutionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    code: ExecutionErrorCode,
    message: String,
    /// Operation index (0-based) that failed
    step: Option<usize>,
}

impl ExecutionError {
    /// Create a division by zero error
    pub fn division_by_zero(numerator: &str, denominator: &str) -> Self {
        Self {
            code: ExecutionErrorCode::DivisionByZero,
            message: format!("'{}' / '{}' divides by zero", numerator, denominator),
            step: None,
        }
    }

    /// Create a join key mismatch error
    pub fn join_key_mismatch(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutionErrorCode::JoinKeyMismatch,
            message: reason.into(),
            step: None,
        }
    }

    /// Create a type coercion error
    pub fn type_coercion(column: &str, value: &serde_json::Value, expected: impl fmt::Display) -> Self {
        Self {
            code: ExecutionErrorCode::TypeCoercionFailure,
            message: format!("value {} cannot be compared with {} column '{}'", value, expected, column),
            step: None,
        }
    }

    /// Create an unknown dataset error
    pub fn unknown_dataset(name: &str) -> Self {
        Self {
            code: ExecutionErrorCode::UnknownDataset,
            message: format!("Dataset '{}' is not loaded", name),
            step: None,
        }
    }

    /// Create an unknown column error
    pub fn unknown_column(name: &str) -> Self {
        Self {
            code: ExecutionErrorCode::UnknownColumn,
            message: format!("Column '{}' does not exist at this step", name),
            step: None,
        }
    }

    /// Attach the failing operation's index
    pub fn at_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutionErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the failing step if known
    pub fn step(&self) -> Option<usize> {
        self.step
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code.code(), self.message)?;
        if let Some(step) = self.step {
            write!(f, " (operation {})", step + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutionError {}

/// Result type for executor operations
pub type ExecResult<T> = Result<T, ExecutionError>;
