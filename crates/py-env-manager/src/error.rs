//! Error types for py-env-manager

use thiserror::Error;

/// Errors that can occur in the Python environment manager
#[derive(Error, Debug)]
pub enum PyEnvError {
    /// Requested interpreter not found
    #[error("Python interpreter '{0}' is not installed or not in PATH")]
    InterpreterNotFound(String),

    /// conda not found
    #[error("conda is not installed or not in PATH")]
    CondaNotFound,

    /// An environment-management command exited non-zero
    #[error("{context} failed with exit code {code}: {stderr}")]
    CommandFailed {
        context: String,
        code: i32,
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for environment-management operations
pub type Result<T> = std::result::Result<T, PyEnvError>;
