//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub API error
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Pull request not found
    #[error("Pull request {0} not found")]
    PrNotFound(String),

    /// Raw HTTP request outside octocrab failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<Error> for cherrypicker_core::Error {
    fn from(err: Error) -> Self {
        cherrypicker_core::Error::Platform(err.to_string())
    }
}

/// Map octocrab "Not Found" responses to [`Error::PrNotFound`]
pub(crate) fn pr_not_found(e: octocrab::Error, what: String) -> Error {
    match &e {
        octocrab::Error::GitHub { source, .. } if source.message.contains("Not Found") => {
            Error::PrNotFound(what)
        }
        _ => Error::Api(e),
    }
}
