//! World host errors.

use thiserror::Error;

use headless_core::{ControlError, SessionId};
use headless_jobs::JobError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The host observed cancellation and abandoned the operation.
    #[error("world operation canceled")]
    Canceled,

    /// The host refused the request.
    #[error("world host rejected the request: {0}")]
    Rejected(String),

    #[error("world session not found: {0}")]
    SessionNotFound(SessionId),

    /// The host failed while carrying out the request.
    #[error("world host failure: {0}")]
    Host(String),

    #[error(transparent)]
    Invalid(#[from] ControlError),
}

impl From<WorldError> for JobError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::Canceled => JobError::Canceled,
            other => JobError::Failed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_maps_to_canceled_job() {
        assert_eq!(JobError::from(WorldError::Canceled), JobError::Canceled);
    }

    #[test]
    fn failures_keep_the_diagnostic() {
        let err = JobError::from(WorldError::Rejected("world limit reached".into()));
        assert_eq!(err, JobError::failed("world host rejected the request: world limit reached"));

        let invalid = ControlError::validation("max_users must be at least 1");
        let err = JobError::from(WorldError::from(invalid));
        assert_eq!(err.message(), "validation failed: max_users must be at least 1");
    }
}
