//! Error types for core domain operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Invalid run mode: {0} (expected merge_gate, continuous_run or release)")]
    InvalidMode(String),

    #[error("Invalid environment kind: {0} (expected pip or conda)")]
    InvalidEnvKind(String),

    #[error("No version declaration found in {0}")]
    VersionNotFound(String),

    #[error("Malformed version declaration: {0}")]
    MalformedVersion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core domain operations
pub type Result<T> = std::result::Result<T, CoreError>;
