//! Error types for hostnet operations.
//!
//! Every failure surfaced by the managers falls into one of three classes:
//! rejected input ([`HostnetError::Validation`]), a failed external command
//! ([`HostnetError::CommandFailed`] / [`HostnetError::Spawn`]) or a missing
//! namespace ([`HostnetError::NamespaceNotFound`]). Configuration errors only
//! occur while the process starts.

use std::io;
use thiserror::Error;

/// Result type alias for hostnet operations.
pub type HostnetResult<T> = Result<T, HostnetError>;

/// Errors that can occur while inspecting or mutating host networking state.
#[derive(Debug, Error)]
pub enum HostnetError {
    /// Input failed the identifier, numeric or address grammar.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// The offending input field.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// Failed to spawn an external command.
    #[error("Failed to execute command '{command}': {source}")]
    Spawn {
        /// The command that could not be started.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// External command returned a non-zero exit code.
    #[error("{output}")]
    CommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code (-1 when terminated by a signal).
        exit_code: i32,
        /// Captured stderr, or a generic message when stderr was empty.
        output: String,
    },

    /// Referenced network namespace does not exist.
    #[error("Namespace '{namespace}' not found")]
    NamespaceNotFound {
        /// The namespace that was looked up.
        namespace: String,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// IO error outside of command execution.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl HostnetError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a namespace not found error.
    pub fn namespace_not_found(namespace: impl Into<String>) -> Self {
        Self::NamespaceNotFound {
            namespace: namespace.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if the input was rejected before any command ran.
    pub fn is_validation(&self) -> bool {
        matches!(self, HostnetError::Validation { .. })
    }

    /// Returns true if an external command failed or could not be spawned.
    pub fn is_exec(&self) -> bool {
        matches!(
            self,
            HostnetError::CommandFailed { .. } | HostnetError::Spawn { .. }
        )
    }

    /// Returns true if a referenced resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostnetError::NamespaceNotFound { .. })
    }

    /// Short machine-readable classification used by outer layers.
    pub fn kind(&self) -> &'static str {
        match self {
            HostnetError::Validation { .. } => "validation",
            HostnetError::Spawn { .. } | HostnetError::CommandFailed { .. } => "exec",
            HostnetError::NamespaceNotFound { .. } => "not_found",
            HostnetError::Config { .. } | HostnetError::Io(_) => "config",
        }
    }
}
