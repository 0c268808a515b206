//! Domain-specific error types for docwizard

use thiserror::Error;

/// Message surfaced when the completion endpoint fails without reporting a detail.
pub const GENERIC_SERVICE_ERROR: &str = "Error while communicating with the completion service.";

/// Main error type for the document wizard
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("No API key is saved. Please enter one.")]
    MissingCredential,

    #[error("Please enter the {field}.")]
    EmptyInput { field: String },

    /// Carries the service-reported detail verbatim so it can be shown as-is.
    #[error("{message}")]
    Service { message: String },

    #[error("Unexpected completion format: {message}")]
    Format { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl WizardError {
    pub fn empty_input(field: impl Into<String>) -> Self {
        WizardError::EmptyInput {
            field: field.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        WizardError::Format {
            message: message.into(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        WizardError::Service {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for WizardError {
    fn from(err: serde_json::Error) -> Self {
        WizardError::Format {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for WizardError {
    fn from(err: reqwest::Error) -> Self {
        tracing::warn!("completion transport failed: {}", err);
        WizardError::Service {
            message: GENERIC_SERVICE_ERROR.to_string(),
        }
    }
}

impl From<std::io::Error> for WizardError {
    fn from(err: std::io::Error) -> Self {
        WizardError::Storage {
            message: err.to_string(),
        }
    }
}

/// Result type alias for wizard operations
pub type Result<T> = std::result::Result<T, WizardError>;
