//! Job failure taxonomy.

use feedline_core::Error;
use feedline_db::DbError;
use thiserror::Error;

/// Why a job failed. The message is shown to operators verbatim as the job
/// status message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// Needs an operator to fix configuration; never retried on its own.
    #[error("{0}")]
    Configuration(String),

    /// Problem with the feed contents; the next fetch starts fresh.
    #[error("{0}")]
    Content(String),

    /// A collaborator failed or refused; the next firing retries.
    #[error("{0}")]
    Transient(String),

    /// Bug or panic inside a job.
    #[error("{0}")]
    Unexpected(String),
}

impl JobError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobError::Transient(_))
    }
}

impl From<Error> for JobError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::NotFound(_) | Error::InvalidInput(_) | Error::Configuration(_) => {
                JobError::Configuration(message)
            }
            Error::Fetch(_)
            | Error::Validation(_)
            | Error::Publish(_)
            | Error::Deployment(_)
            | Error::StorageUnavailable(_)
            | Error::Timeout(_) => JobError::Transient(message),
            Error::Internal(_) => JobError::Unexpected(message),
        }
    }
}

impl From<DbError> for JobError {
    fn from(err: DbError) -> Self {
        Error::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bare_message() {
        let err = JobError::Configuration("Pinned deployment does not exist.".to_string());
        assert_eq!(err.to_string(), "Pinned deployment does not exist.");
    }

    #[test]
    fn test_collaborator_errors_map_to_taxonomy() {
        assert!(JobError::from(Error::StorageUnavailable("down".into())).is_retryable());
        assert!(matches!(
            JobError::from(Error::InvalidInput("no url".into())),
            JobError::Configuration(_)
        ));
        assert!(matches!(
            JobError::from(DbError::NotFound("feed source".into())),
            JobError::Configuration(_)
        ));
        assert!(matches!(
            JobError::from(Error::Internal("bug".into())),
            JobError::Unexpected(_)
        ));
    }
}
