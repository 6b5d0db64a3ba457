//! Repository error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot format error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DbResult<T> = std::result::Result<T, DbError>;

impl From<DbError> for feedline_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => feedline_core::Error::NotFound(what),
            other => feedline_core::Error::Internal(other.to_string()),
        }
    }
}
