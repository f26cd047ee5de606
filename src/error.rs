//! Error types for the cloudform deployment system.
//!
//! This module provides the error hierarchy for every step of a stack
//! operation: configuration loading, remote control-plane calls, change-set
//! lifecycle failures and operator interaction.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the cloudform deployment system.
#[derive(Debug, Error)]
pub enum CloudformError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stack and change-set errors.
    #[error(transparent)]
    Stack(#[from] StackError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A required value was provided neither by flag nor by file.
    #[error("Missing required value: {name}")]
    MissingValue {
        /// Name of the missing value.
        name: String,
    },

    /// A `KEY=VALUE` pair could not be parsed.
    #[error("Invalid key/value pair '{input}': expected KEY=VALUE")]
    InvalidPair {
        /// The offending input.
        input: String,
    },
}

/// Errors raised while driving a stack through its lifecycle.
///
/// Provider errors are normalized into these variants at the client
/// boundary; orchestration code only ever sees this taxonomy.
#[derive(Debug, Error)]
pub enum StackError {
    /// The stack (or change set) does not exist.
    #[error("Stack does not exist: {name}")]
    NotFound {
        /// Name or id that was looked up.
        name: String,
    },

    /// The remote rejected a malformed request.
    #[error("{message}")]
    ValidationRejected {
        /// Operation that was rejected.
        operation: String,
        /// Message returned by the remote, verbatim.
        message: String,
    },

    /// The submitted template and parameters produce no changes.
    #[error("No changes detected for stack {stack_name}")]
    NoChangesDetected {
        /// Stack the change set targeted.
        stack_name: String,
    },

    /// A change set or stack transitioned to a failed category.
    #[error("{reason}")]
    RemoteOperationFailed {
        /// Change set or stack that failed.
        name: String,
        /// Reason reported by the remote.
        reason: String,
    },

    /// The operator declined the confirmation prompt.
    #[error("user cancelled deployment")]
    UserCancelled,

    /// The operation was abandoned locally (cancellation or deadline).
    #[error("Cancelled while {operation}")]
    Cancelled {
        /// Operation in flight when cancellation was observed.
        operation: String,
    },

    /// Network, auth or unexpected remote failure.
    #[error("{operation}: {message}")]
    Transport {
        /// Operation that failed.
        operation: String,
        /// Underlying error description.
        message: String,
    },

    /// Nested change sets exceeded the configured depth guard.
    #[error("Nested change set {change_set} exceeds the maximum nesting depth of {limit}")]
    NestingTooDeep {
        /// Change set at which the guard tripped.
        change_set: String,
        /// Configured limit.
        limit: usize,
    },

    /// Fetching a change set failed while rendering the diff tree.
    #[error("error getting changeset '{change_set}' for stack '{stack_name}': {source}")]
    Render {
        /// Stack name used for the lookup (empty for nested lookups by id).
        stack_name: String,
        /// Change set name or id.
        change_set: String,
        /// Underlying failure.
        #[source]
        source: Box<CloudformError>,
    },
}

/// Result type alias for cloudform operations.
pub type Result<T> = std::result::Result<T, CloudformError>;

impl CloudformError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error means the stack does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Stack(StackError::NotFound { .. }))
    }

    /// Returns true if this error is the "no changes" short-circuit.
    #[must_use]
    pub const fn is_no_changes(&self) -> bool {
        matches!(self, Self::Stack(StackError::NoChangesDetected { .. }))
    }

    /// Returns true if the operator declined the deployment.
    #[must_use]
    pub const fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::Stack(StackError::UserCancelled))
    }

    /// Returns true if the operation was abandoned locally.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Stack(StackError::Cancelled { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl StackError {
    /// Creates a transport error for the given operation.
    #[must_use]
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a validation rejection for the given operation.
    #[must_use]
    pub fn validation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationRejected {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a local cancellation error.
    #[must_use]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_failure_displays_reason_verbatim() {
        let err = CloudformError::from(StackError::RemoteOperationFailed {
            name: String::from("app-1700000000"),
            reason: String::from("Template format error: unsupported structure."),
        });
        assert_eq!(err.to_string(), "Template format error: unsupported structure.");
    }

    #[test]
    fn test_predicates() {
        assert!(CloudformError::from(StackError::NotFound { name: "a".into() }).is_not_found());
        assert!(CloudformError::from(StackError::UserCancelled).is_user_cancelled());
        assert!(CloudformError::from(StackError::cancelled("polling")).is_cancelled());
        assert!(!CloudformError::internal("boom").is_not_found());
    }

    #[test]
    fn test_render_error_names_pair() {
        let err = StackError::Render {
            stack_name: String::from("app"),
            change_set: String::from("app-1"),
            source: Box::new(StackError::transport("describing change set", "timed out").into()),
        };
        assert_eq!(
            err.to_string(),
            "error getting changeset 'app-1' for stack 'app': describing change set: timed out"
        );
    }
}
