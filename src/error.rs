//! Error types for the Stackpilot deployment system.
//!
//! This module provides the error hierarchy for all operations in the
//! change-set lifecycle: configuration loading, template rendering,
//! stack/change-set orchestration, provider calls and file transfer.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Stackpilot deployment system.
#[derive(Debug, Error)]
pub enum StackpilotError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template rendering errors.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Stack lifecycle errors.
    #[error("Stack error: {0}")]
    Stack(#[from] StackError),

    /// Remote provider errors.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Upload and packaging errors.
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

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
    Parse {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// No document matches the requested environment and region.
    #[error("Environment {environment} for {region} not found in configuration")]
    NotFound {
        /// Requested environment name.
        environment: String,
        /// Requested region, or a placeholder when omitted.
        region: String,
    },

    /// Validation of a resolved configuration failed.
    #[error("Configuration validation failed: {message}")]
    Validation {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A placeholder references a variable that is not defined.
    #[error("Undefined variable '{name}' while rendering {field}")]
    UndefinedVariable {
        /// Name of the missing variable.
        name: String,
        /// Field being rendered.
        field: String,
    },

    /// A placeholder is malformed or uses an unknown filter.
    #[error("Template syntax error in {field}: {message}")]
    Syntax {
        /// Description of the syntax problem.
        message: String,
        /// Field being rendered.
        field: String,
    },
}

/// Stack and change-set lifecycle errors.
#[derive(Debug, Error)]
pub enum StackError {
    /// An existing pending change blocks creation of a new one.
    #[error("Existing change set {change_set} ({status}) blocks deployment under policy {policy}")]
    Conflict {
        /// Name of the blocking change set.
        change_set: String,
        /// Status of the blocking change set.
        status: String,
        /// The active conflict policy.
        policy: String,
    },

    /// The provider rejected or failed the change-set proposal.
    #[error("ChangeSet creation failed for {stack_name} - Status: {status}, Reason: {reason}")]
    ChangeCreation {
        /// Stack the change set targeted.
        stack_name: String,
        /// Terminal change-set status.
        status: String,
        /// Failure reason reported by the provider.
        reason: String,
    },

    /// Executing a change set ended in a non-success terminal state.
    #[error("ChangeSet {change_set} for {stack_name} failed: {reason}")]
    ChangeApply {
        /// Stack the change set targeted.
        stack_name: String,
        /// Change set name or id.
        change_set: String,
        /// Terminal stack status or failure reason.
        reason: String,
    },

    /// A bounded wait elapsed without reaching a terminal state.
    ///
    /// Distinct from provider-reported failure: the remote operation may
    /// still be in flight.
    #[error("Timed out waiting for {waiting_for} on stack {stack_name}")]
    Timeout {
        /// Stack being waited on.
        stack_name: String,
        /// Description of the awaited condition.
        waiting_for: String,
    },

    /// Stack deletion failed or timed out.
    #[error("Deletion of stack {stack_name} failed: {reason}")]
    Deletion {
        /// Stack being deleted.
        stack_name: String,
        /// Failure reason.
        reason: String,
    },

    /// A destructive operation was requested without confirmation.
    #[error("Deletion of stack {stack_name} not confirmed")]
    NotConfirmed {
        /// Stack that would have been deleted.
        stack_name: String,
    },

    /// The requested stack output does not exist.
    #[error("Output {output_key} not found on stack {stack_name}")]
    OutputNotFound {
        /// Stack queried for the output.
        stack_name: String,
        /// Requested output key.
        output_key: String,
    },

    /// The stack is in a state that does not accept new change sets.
    #[error("Stack {stack_name} is not in a deployable status: {status}")]
    NotDeployable {
        /// Stack name.
        stack_name: String,
        /// Current stack status.
        status: String,
    },

    /// The stack does not exist.
    #[error("Stack {stack_name} not found")]
    StackNotFound {
        /// Missing stack name.
        stack_name: String,
    },
}

/// Remote provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// An API call failed.
    #[error("CloudFormation API error during {operation}: {message}")]
    Api {
        /// Operation that failed.
        operation: String,
        /// Error message from the provider.
        message: String,
    },

    /// The referenced change set does not exist.
    #[error("ChangeSet {change_set} not found")]
    ChangeSetNotFound {
        /// Missing change set name or id.
        change_set: String,
    },
}

/// Upload and packaging errors.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Uploading a file to remote storage failed.
    #[error("Upload of {file} to s3://{bucket}/{key} failed: {message}")]
    Upload {
        /// Local file name.
        file: String,
        /// Target bucket.
        bucket: String,
        /// Target key.
        key: String,
        /// Failure description.
        message: String,
    },

    /// Building a deployable artifact failed.
    #[error("Packaging failed: {message}")]
    Packaging {
        /// Failure description.
        message: String,
    },
}

/// Result type alias for Stackpilot operations.
pub type Result<T> = std::result::Result<T, StackpilotError>;

impl StackpilotError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ConfigError {
    /// Creates a parse error with an optional source location.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: Option<String>) -> Self {
        Self::Parse {
            message: message.into(),
            location,
        }
    }

    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }
}

impl ProviderError {
    /// Creates an API error for the given operation.
    #[must_use]
    pub fn api(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            message: message.into(),
        }
    }
}
