//! Error types for precommit.
//!
//! Only configuration and repository errors abort an invocation. Everything
//! else is captured into the outcome of the check that produced it.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in precommit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// Configuration file not found.
    #[error("Configuration file not found: {path}. You can create it with 'precommit init'.")]
    ConfigNotFound {
        /// Path where config was expected.
        path: PathBuf,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        /// Description of the parse error.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    ConfigInvalid {
        /// Field name that is invalid.
        field: String,
        /// Description of why it's invalid.
        message: String,
    },

    // =========================================================================
    // Repository errors
    // =========================================================================
    /// Not in a Git repository.
    #[error("Not in a Git repository")]
    NotGitRepo,

    /// Git operation failed.
    #[error("Git operation failed: {operation} - {message}")]
    GitOperation {
        /// Name of the operation that failed.
        operation: String,
        /// Error message.
        message: String,
    },

    // =========================================================================
    // Check execution errors
    // =========================================================================
    /// A check's run or fix logic failed unexpectedly.
    #[error("Check '{name}' raised an error: {message}")]
    CheckExecution {
        /// Name of the check.
        name: String,
        /// Error message.
        message: String,
    },

    /// Command not found.
    #[error("Command not found: {command}")]
    CommandNotFound {
        /// The command that wasn't found.
        command: String,
    },

    /// The argument list exceeded the operating system limit.
    #[error("Argument list too long for '{command}' ({files} files)")]
    ArgumentOverflow {
        /// The command that could not be spawned.
        command: String,
        /// Number of file arguments that were appended.
        files: usize,
    },

    /// Command killed after exceeding its timeout.
    #[error("Command '{command}' timed out after {timeout}")]
    CommandTimeout {
        /// The command that timed out.
        command: String,
        /// Timeout duration as string.
        timeout: String,
    },

    // =========================================================================
    // Hook errors
    // =========================================================================
    /// Hook already exists and wasn't created by us.
    #[error("Git hook already exists at {path}. Use --force to overwrite.")]
    HookExists {
        /// Path to existing hook.
        path: PathBuf,
    },

    // =========================================================================
    // I/O errors
    // =========================================================================
    /// File I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Description of what failed.
        message: String,
        /// Source error.
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Internal errors
    // =========================================================================
    /// Internal error (should never happen).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Creates a new configuration parse error.
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new configuration parse error with source.
    pub fn config_parse_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new invalid configuration error.
    pub fn config_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new I/O error with context.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Creates a new Git operation error.
    pub fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GitOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a new check execution error.
    pub fn check_execution(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CheckExecution {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns true for configuration errors.
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. } | Self::ConfigParse { .. } | Self::ConfigInvalid { .. }
        )
    }

    /// Returns true for repository errors.
    pub const fn is_repository_error(&self) -> bool {
        matches!(self, Self::NotGitRepo | Self::GitOperation { .. })
    }

    /// Returns an exit code appropriate for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.is_config_error() {
            78 // EX_CONFIG
        } else if self.is_repository_error() {
            65 // EX_DATAERR
        } else {
            1
        }
    }
}
