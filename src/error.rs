use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field-level validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// Caller must fix the event and resubmit; never retried automatically
    #[error("Validation failed: {}", join_field_errors(.errors))]
    ValidationFailed { errors: Vec<FieldError> },

    #[error("Signing failed: {message}")]
    SigningFailed {
        message: String,
        needs_password: bool,
    },

    #[error("Publishing failed: {message}")]
    PublishingFailed { message: String },

    /// Capacity exceeded; rejected immediately
    #[error("Queue error: {message}")]
    Queue { message: String },

    /// Programmer error such as an unknown event id
    #[error("Event management error: {message}")]
    EventManagement { message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    pub fn signing(message: impl Into<String>) -> Self {
        PipelineError::SigningFailed {
            message: message.into(),
            needs_password: false,
        }
    }

    pub fn publishing(message: impl Into<String>) -> Self {
        PipelineError::PublishingFailed {
            message: message.into(),
        }
    }

    pub fn queue(message: impl Into<String>) -> Self {
        PipelineError::Queue {
            message: message.into(),
        }
    }

    pub fn event_management(message: impl Into<String>) -> Self {
        PipelineError::EventManagement {
            message: message.into(),
        }
    }

    /// Field errors carried by a validation failure, empty otherwise
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            PipelineError::ValidationFailed { errors } => errors,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
