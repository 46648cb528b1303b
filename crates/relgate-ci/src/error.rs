//! Error types for pipeline operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CiError {
    /// A fail-fast stage exited non-zero
    #[error("Stage '{stage}' exited with code {code}")]
    StageFailed { stage: String, code: i32 },

    /// No artifact matched after a build step
    #[error("No artifact matching '{pattern}' found in {dir}")]
    ArtifactNotFound { pattern: String, dir: String },

    /// Companion workspace missing
    #[error("Companion workspace not found at {0}")]
    CompanionWorkspaceNotFound(String),

    /// Tool download failed
    #[error("Download failed: {0}")]
    Http(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Core domain error
    #[error(transparent)]
    Core(#[from] relgate_core::CoreError),

    /// Environment-management error
    #[error(transparent)]
    PyEnv(#[from] py_env_manager::PyEnvError),
}

impl From<reqwest::Error> for CiError {
    fn from(err: reqwest::Error) -> Self {
        CiError::Http(err.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, CiError>;
