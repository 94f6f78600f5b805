//! Error taxonomy for the template repository
//!
//! Every variant carries the entity id and the operation that failed so a log
//! line or CLI message is enough to locate the problem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("{operation}: invalid request for '{id}': {reason}")]
    Validation {
        id: String,
        operation: &'static str,
        reason: String,
    },

    #[error("{operation}: template '{id}' not found")]
    NotFound { id: String, operation: &'static str },

    #[error("{operation}: persistence failure for '{id}': {message}")]
    Persistence {
        id: String,
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: upstream analysis failed for '{id}': {message}")]
    UpstreamAnalysis {
        id: String,
        operation: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, TemplateError>;

impl TemplateError {
    pub fn validation(id: impl Into<String>, operation: &'static str, reason: impl Into<String>) -> Self {
        TemplateError::Validation {
            id: id.into(),
            operation,
            reason: reason.into(),
        }
    }

    pub fn not_found(id: impl Into<String>, operation: &'static str) -> Self {
        TemplateError::NotFound {
            id: id.into(),
            operation,
        }
    }

    pub fn persistence(id: impl Into<String>, operation: &'static str, err: impl std::fmt::Display) -> Self {
        TemplateError::Persistence {
            id: id.into(),
            operation,
            message: err.to_string(),
        }
    }

    pub fn upstream(id: impl Into<String>, operation: &'static str, err: impl std::fmt::Display) -> Self {
        TemplateError::UpstreamAnalysis {
            id: id.into(),
            operation,
            message: err.to_string(),
        }
    }

    /// Entity id the error refers to
    pub fn id(&self) -> &str {
        match self {
            TemplateError::Validation { id, .. }
            | TemplateError::NotFound { id, .. }
            | TemplateError::Persistence { id, .. }
            | TemplateError::UpstreamAnalysis { id, .. } => id,
        }
    }

    /// Operation that produced the error
    pub fn operation(&self) -> &'static str {
        match self {
            TemplateError::Validation { operation, .. }
            | TemplateError::NotFound { operation, .. }
            | TemplateError::Persistence { operation, .. }
            | TemplateError::UpstreamAnalysis { operation, .. } => operation,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TemplateError::NotFound { .. })
    }
}
