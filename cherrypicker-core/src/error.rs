//! Error types for cherrypicker

use thiserror::Error;

/// Result type alias for cherry-pick operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cherry-pick operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A git operation on the local working copy failed
    #[error("Git error: {0}")]
    Git(String),

    /// The requested branch does not exist upstream
    #[error("Branch '{0}' not found")]
    BranchNotFound(String),

    /// The code-hosting platform rejected or failed a call
    #[error("Platform error: {0}")]
    Platform(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Git(err.message().to_string())
    }
}
