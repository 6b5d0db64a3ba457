//! Error types for Feedline collaborators.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("deployment failed: {0}")]
    Deployment(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the failure is expected to clear up on its own at the next
    /// scheduled attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Fetch(_) | Error::StorageUnavailable(_) | Error::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
