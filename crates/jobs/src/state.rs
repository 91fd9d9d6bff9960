//! Job state, its status projection, and the job error channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a job did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum JobError {
    /// The work observed its cancellation token and stopped.
    #[error("job was canceled")]
    Canceled,

    /// The work returned a failure.
    #[error("job failed: {0}")]
    Failed(String),

    /// The work panicked; the payload text is kept as the diagnostic.
    #[error("job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Diagnostic text without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            JobError::Canceled => "canceled",
            JobError::Failed(msg) | JobError::Panicked(msg) => msg,
        }
    }
}

impl From<anyhow::Error> for JobError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(format!("{err:#}"))
    }
}

/// Externally visible status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Canceled,
    Faulted,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Canceled => "canceled",
            JobStatus::Faulted => "faulted",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the wrapped action.
///
/// Starts as `Running` and moves to exactly one terminal variant. The
/// transition is made once by the job's driver task; nothing moves a job back
/// to `Running`.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState<T> {
    Running,
    Completed(T),
    Canceled,
    Faulted(JobError),
}

impl<T> JobState<T> {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Running => JobStatus::Running,
            JobState::Completed(_) => JobStatus::Completed,
            JobState::Canceled => JobStatus::Canceled,
            JobState::Faulted(_) => JobStatus::Faulted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn output(&self) -> Option<&T> {
        match self {
            JobState::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&JobError> {
        match self {
            JobState::Faulted(err) => Some(err),
            _ => None,
        }
    }

    /// Terminal state for a finished work body.
    pub(crate) fn from_result(result: Result<T, JobError>) -> Self {
        match result {
            Ok(value) => JobState::Completed(value),
            Err(JobError::Canceled) => JobState::Canceled,
            Err(err) => JobState::Faulted(err),
        }
    }
}
