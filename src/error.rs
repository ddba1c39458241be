//! Domain errors for content fetching, normalization and preview

use thiserror::Error;

/// Errors surfaced by the content pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required CMS field is absent or has the wrong shape
    #[error("Missing or malformed field: {0}")]
    MissingField(String),

    /// Network or content store failure
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Preview token did not resolve against the content store
    #[error("Invalid token")]
    InvalidToken,

    /// Requested document does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A page load is already running for this cursor
    #[error("A page load is already in flight")]
    LoadInFlight,

    /// Query parameters rejected before reaching the store
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Fetch(err.to_string())
    }
}

/// Result alias for the content pipeline
pub type Result<T> = std::result::Result<T, Error>;
