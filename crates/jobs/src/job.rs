//! Handle to one tracked job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use headless_core::JobId;

use crate::state::{JobState, JobStatus};

/// Plain-data view of a job, as handed to the REST boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: JobId,
    pub description: String,
    pub status: JobStatus,
}

/// A tracked background job.
///
/// Cheap to clone; every clone observes the same state and shares the same
/// cancellation token.
#[derive(Debug)]
pub struct Job<T> {
    inner: Arc<JobInner<T>>,
}

#[derive(Debug)]
struct JobInner<T> {
    id: JobId,
    seq: u64,
    description: String,
    created_at: DateTime<Utc>,
    cancel: CancellationToken,
    state: watch::Sender<JobState<T>>,
}

impl<T> Clone for Job<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Job<T> {
    pub(crate) fn new(id: JobId, seq: u64, description: String, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(JobState::Running);
        Self {
            inner: Arc::new(JobInner {
                id,
                seq,
                description,
                created_at: Utc::now(),
                cancel,
                state,
            }),
        }
    }

    pub fn id(&self) -> JobId {
        self.inner.id
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Current status, projected from the job state at read time.
    pub fn status(&self) -> JobStatus {
        self.inner.state.borrow().status()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Request cooperative cancellation of the wrapped work.
    ///
    /// Has no effect on a job that already reached a terminal state.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub fn descriptor(&self) -> JobDescriptor {
        JobDescriptor {
            id: self.inner.id,
            description: self.inner.description.clone(),
            status: self.status(),
        }
    }

    /// Registration order within the owning registry.
    pub(crate) fn seq(&self) -> u64 {
        self.inner.seq
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Move the job to `terminal`. Returns `false` if it was already settled.
    pub(crate) fn settle(&self, terminal: JobState<T>) -> bool {
        self.inner.state.send_if_modified(move |state| {
            if state.is_terminal() {
                return false;
            }
            *state = terminal;
            true
        })
    }
}

impl<T: Clone> Job<T> {
    /// Snapshot of the full job state, including the output or error.
    pub fn state(&self) -> JobState<T> {
        self.inner.state.borrow().clone()
    }

    /// Wait until the job reaches a terminal state and return it.
    pub async fn wait(&self) -> JobState<T> {
        let mut rx = self.inner.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let state = match rx.wait_for(JobState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }
}
