//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::io;

use thiserror::Error;

use crate::errors::ConfigurationError;
use crate::record::CollectionError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// Data or argument is not valid JSON of the expected shape
    InputError,
    /// Pipeline failed to build
    PipelineError,
    /// Collection exceeds `max_documents`
    TooManyDocuments,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DOCPIPE_CLI_CONFIG_ERROR",
            Self::IoError => "DOCPIPE_CLI_IO_ERROR",
            Self::InputError => "DOCPIPE_CLI_INPUT_ERROR",
            Self::PipelineError => "DOCPIPE_CLI_PIPELINE_ERROR",
            Self::TooManyDocuments => "DOCPIPE_CLI_TOO_MANY_DOCUMENTS",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
#[error("{}: {message}", .code.code())]
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

    pub fn input_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InputError, msg)
    }

    pub fn too_many_documents(count: usize, max: usize) -> Self {
        Self::new(
            CliErrorCode::TooManyDocuments,
            format!("Collection has {} documents, max_documents is {}", count, max),
        )
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

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::input_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigurationError> for CliError {
    fn from(e: ConfigurationError) -> Self {
        Self::new(CliErrorCode::PipelineError, e.to_string())
    }
}

impl From<CollectionError> for CliError {
    fn from(e: CollectionError) -> Self {
        Self::input_error(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let err = CliError::too_many_documents(10, 5);
        assert_eq!(err.code(), &CliErrorCode::TooManyDocuments);
        assert_eq!(
            err.to_string(),
            "DOCPIPE_CLI_TOO_MANY_DOCUMENTS: Collection has 10 documents, max_documents is 5"
        );
    }

    #[test]
    fn test_pipeline_error_conversion() {
        let err: CliError = ConfigurationError::negative_skip(-2).at_stage(0).into();
        assert_eq!(err.code_str(), "DOCPIPE_CLI_PIPELINE_ERROR");
        assert!(err.message().starts_with("NEGATIVE_SKIP"));
    }
}
