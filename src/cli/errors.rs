//! CLI-specific error types
//!
//! Any CLI error ends the process with a non-zero exit code.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::engine::EngineError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout or a local file)
    IoError,
    /// A serve request was not one of the known shapes
    InvalidRequest,
    /// A dataset named on the command line could not be loaded
    LoadFailed,
    /// A question could not be answered
    QueryFailed,
    /// The async runtime could not be started
    RuntimeFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "TQ_CLI_CONFIG_ERROR",
            Self::IoError => "TQ_CLI_IO_ERROR",
            Self::InvalidRequest => "TQ_CLI_INVALID_REQUEST",
            Self::LoadFailed => "TQ_CLI_LOAD_FAILED",
            Self::QueryFailed => "TQ_CLI_QUERY_FAILED",
            Self::RuntimeFailed => "TQ_CLI_RUNTIME_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidRequest, msg)
    }

    /// Loading `dataset` failed with `error`
    pub fn load_failed(dataset: &str, error: &EngineError) -> Self {
        Self::new(
            CliErrorCode::LoadFailed,
            format!("{}: {} ({})", dataset, error.user_message(), error.kind()),
        )
    }

    pub fn query_failed(error: &EngineError) -> Self {
        Self::new(
            CliErrorCode::QueryFailed,
            format!("{} ({})", error.user_message(), error.kind()),
        )
    }

    pub fn runtime_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::RuntimeFailed, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
