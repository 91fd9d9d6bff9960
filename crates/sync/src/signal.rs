//! Set-once completion signal for a retried upload.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use headless_jobs::JobError;

/// Why an upload ended without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The classifier ruled the last failure permanent.
    Permanent,
    /// Every allowed attempt failed with a retryable error.
    Exhausted,
    /// Cancellation was requested before another attempt could start.
    Canceled,
}

/// Final result of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// An attempt ran to completion and reported this success flag.
    Completed { success: bool },
    Failed { reason: FailureReason, message: String },
}

impl UploadOutcome {
    pub fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        Self::Failed {
            reason,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Completed { success: true })
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            UploadOutcome::Failed { reason, .. } => Some(*reason),
            UploadOutcome::Completed { .. } => None,
        }
    }

    /// Map the outcome onto the job error channel.
    pub fn into_job_result(self) -> Result<(), JobError> {
        match self {
            UploadOutcome::Completed { success: true } => Ok(()),
            UploadOutcome::Completed { success: false } => {
                Err(JobError::failed("upload reported an unsuccessful result"))
            }
            UploadOutcome::Failed {
                reason: FailureReason::Canceled,
                ..
            } => Err(JobError::Canceled),
            UploadOutcome::Failed { message, .. } => Err(JobError::Failed(message)),
        }
    }
}

/// Single point of resolution for one upload.
///
/// Clones share the same cell. The first [`resolve`](Self::resolve) wins;
/// every later call is ignored.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    cell: Arc<watch::Sender<Option<UploadOutcome>>>,
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSignal {
    pub fn new() -> Self {
        let (cell, _) = watch::channel(None);
        Self { cell: Arc::new(cell) }
    }

    /// Resolve the signal. Returns `false` if it was already resolved.
    pub fn resolve(&self, outcome: UploadOutcome) -> bool {
        self.cell.send_if_modified(move |slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.borrow().is_some()
    }

    /// The outcome, if the signal has been resolved.
    pub fn outcome(&self) -> Option<UploadOutcome> {
        self.cell.borrow().clone()
    }

    /// Wait for the signal to be resolved.
    pub async fn wait(&self) -> UploadOutcome {
        let mut rx = self.cell.subscribe();
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            // `self` keeps the sender alive, so `changed` cannot fail here.
            if rx.changed().await.is_err() {
                return self.outcome().unwrap_or_else(|| {
                    UploadOutcome::failed(FailureReason::Canceled, "completion signal dropped")
                });
            }
        }
    }
}
