//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be parsed or failed validation
    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: ContractError,
    },

    /// A pipeline task panicked or was aborted
    #[error("Pipeline task '{task}' failed: {message}")]
    TaskFailed { task: &'static str, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_load(path: impl Into<String>, source: ContractError) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            source,
        }
    }

    pub fn task_failed(task: &'static str, message: impl Into<String>) -> Self {
        Self::TaskFailed {
            task,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CliError::config_not_found("pingboard.toml");
        assert_eq!(err.to_string(), "Configuration file not found: pingboard.toml");

        let err = CliError::config_load(
            "bad.toml",
            ContractError::config_validation("destinations", "must not be empty"),
        );
        assert!(err.to_string().starts_with("Failed to load configuration from bad.toml"));

        let err = CliError::task_failed("dispatcher", "panicked");
        assert_eq!(err.to_string(), "Pipeline task 'dispatcher' failed: panicked");
    }
}
