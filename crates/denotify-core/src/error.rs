//! Error types and exit codes for denotify
//!
//! Exit codes:
//! - 0: Success (warnings alone never change the exit code)
//! - 1: Generic failure, including runs where single files failed
//! - 2: Usage error (bad flags/args, unreadable config)
//! - 3: Data error (input vault missing or not a vault)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the denotify binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Data error - missing input, invalid vault (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur during a conversion run
#[derive(Error, Debug)]
pub enum DenotifyError {
    // Usage errors (exit code 2)
    #[error("{0}")]
    UsageError(String),

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    #[error("unsupported {context}: {value} (supported: {supported})")]
    Unsupported {
        context: String,
        value: String,
        supported: String,
    },

    #[error("invalid config in {path:?}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    // Data errors (exit code 3)
    #[error("input not found: {path:?}")]
    InputNotFound { path: PathBuf },

    #[error("invalid vault: {reason}")]
    InvalidVault { reason: String },

    // Generic failures (exit code 1)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to {operation} {target}: {reason}")]
    FailedOperationWithTarget {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl DenotifyError {
    /// Create an error for a failed IO operation with context
    pub fn io_operation(
        operation: &str,
        path: impl std::fmt::Display,
        error: impl std::fmt::Display,
    ) -> Self {
        DenotifyError::FailedOperationWithTarget {
            operation: operation.to_string(),
            target: path.to_string(),
            reason: error.to_string(),
        }
    }

    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl std::fmt::Display) -> Self {
        DenotifyError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for an unsupported value
    pub fn unsupported(
        context: &str,
        value: impl std::fmt::Display,
        supported: impl std::fmt::Display,
    ) -> Self {
        DenotifyError::Unsupported {
            context: context.to_string(),
            value: value.to_string(),
            supported: supported.to_string(),
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            DenotifyError::UsageError(_)
            | DenotifyError::InvalidValue { .. }
            | DenotifyError::Unsupported { .. }
            | DenotifyError::InvalidConfig { .. } => ExitCode::Usage,

            DenotifyError::InputNotFound { .. } | DenotifyError::InvalidVault { .. } => {
                ExitCode::Data
            }

            DenotifyError::Io(_)
            | DenotifyError::Yaml(_)
            | DenotifyError::Json(_)
            | DenotifyError::FailedOperationWithTarget { .. }
            | DenotifyError::Other(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            DenotifyError::UsageError(_) => "usage_error",
            DenotifyError::InvalidValue { .. } => "invalid_value",
            DenotifyError::Unsupported { .. } => "unsupported",
            DenotifyError::InvalidConfig { .. } => "invalid_config",
            DenotifyError::InputNotFound { .. } => "input_not_found",
            DenotifyError::InvalidVault { .. } => "invalid_vault",
            DenotifyError::Io(_) => "io_error",
            DenotifyError::Yaml(_) => "yaml_error",
            DenotifyError::Json(_) => "json_error",
            DenotifyError::FailedOperationWithTarget { .. } => "failed_operation_with_target",
            DenotifyError::Other(_) => "other",
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for denotify operations
pub type Result<T> = std::result::Result<T, DenotifyError>;
