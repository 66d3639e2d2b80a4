//! Configuration errors

use std::fmt;

/// Configuration error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// File missing or unreadable
    ReadFailed,
    /// File is not valid JSON for `EngineConfig`
    InvalidJson,
    /// Parsed, but a value is out of range
    InvalidValue,
    /// A client could not be built from the settings
    BuildFailed,
}

impl ConfigErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadFailed => "TQ_CONFIG_READ_FAILED",
            Self::InvalidJson => "TQ_CONFIG_INVALID_JSON",
            Self::InvalidValue => "TQ_CONFIG_INVALID_VALUE",
            Self::BuildFailed => "TQ_CONFIG_BUILD_FAILED",
        }
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    pub fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::ReadFailed, msg)
    }

    pub fn invalid_json(msg: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::InvalidJson, msg)
    }

    /// A field failed validation
    pub fn invalid_value(field: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorCode::InvalidValue,
            format!("{}: {}", field, reason),
        )
    }

    pub fn build_failed(msg: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::BuildFailed, msg)
    }

    pub fn code(&self) -> &ConfigErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;
