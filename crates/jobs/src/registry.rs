//! In-process catalog of running and recently finished jobs.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use headless_core::{JobId, panic_message};

use crate::job::Job;
use crate::state::{JobError, JobState};

/// Source of candidate job identifiers.
pub type IdSource = Box<dyn Fn() -> JobId + Send + Sync>;

/// Thread-safe registry of jobs keyed by [`JobId`].
///
/// Jobs stay registered until a [`try_get_job`](Self::try_get_job) call
/// observes them in a terminal state. Peeking never removes.
pub struct JobRegistry<T> {
    catalog: RwLock<Catalog<T>>,
    next_id: IdSource,
}

struct Catalog<T> {
    jobs: HashMap<JobId, Job<T>>,
    next_seq: u64,
}

impl<T> std::fmt::Debug for JobRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.read().jobs.len())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for JobRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> JobRegistry<T> {
    pub fn new() -> Self {
        Self::with_id_source(Box::new(JobId::new))
    }

    /// Registry drawing ids from `next_id` instead of fresh UUIDv7 values.
    pub fn with_id_source(next_id: IdSource) -> Self {
        Self {
            catalog: RwLock::new(Catalog {
                jobs: HashMap::new(),
                next_seq: 0,
            }),
            next_id,
        }
    }

    /// Register `work` as a job and start it in the background.
    ///
    /// The job is inserted before the work is scheduled, and the work body runs
    /// only after the driver task has yielded once, so the returned handle is
    /// always visible through [`jobs`](Self::jobs) before any caller code runs.
    /// Must be called from within a Tokio runtime.
    pub fn create_job<F, Fut>(&self, description: impl Into<String>, work: F) -> Job<T>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, JobError>> + Send + 'static,
    {
        let job = {
            let mut catalog = self.write();
            let id = loop {
                let candidate = (self.next_id)();
                if !catalog.jobs.contains_key(&candidate) {
                    break candidate;
                }
                debug!(job_id = %candidate, "job id already tracked, regenerating");
            };
            let seq = catalog.next_seq;
            catalog.next_seq += 1;
            let job = Job::new(id, seq, description.into(), CancellationToken::new());
            catalog.jobs.insert(id, job.clone());
            job
        };

        debug!(job_id = %job.id(), description = job.description(), "job created");
        tokio::spawn(drive(job.clone(), work));
        job
    }

    /// Snapshot of every tracked job, oldest first.
    pub fn jobs(&self) -> Vec<Job<T>> {
        let mut jobs: Vec<_> = self.read().jobs.values().cloned().collect();
        jobs.sort_by_key(Job::seq);
        jobs
    }

    /// Look up a job, consuming it from the registry if it has finished.
    ///
    /// The job is still returned on the call that removes it; later calls
    /// report it as missing.
    pub fn try_get_job(&self, id: JobId) -> Option<Job<T>> {
        let mut catalog = self.write();
        let job = catalog.jobs.get(&id)?.clone();
        if job.is_terminal() {
            catalog.jobs.remove(&id);
            debug!(job_id = %id, status = %job.status(), "terminal job removed from registry");
        }
        Some(job)
    }

    /// Look up a job without ever removing it.
    pub fn try_peek_job(&self, id: JobId) -> Option<Job<T>> {
        self.read().jobs.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().jobs.is_empty()
    }
}

impl<T> JobRegistry<T> {
    fn read(&self) -> RwLockReadGuard<'_, Catalog<T>> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog<T>> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn drive<T, F, Fut>(job: Job<T>, work: F)
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, JobError>>,
{
    tokio::task::yield_now().await;

    let token = job.cancellation_token();
    let outcome = AssertUnwindSafe(async move { work(token).await })
        .catch_unwind()
        .await;

    let terminal = match outcome {
        Ok(result) => JobState::from_result(result),
        Err(payload) => JobState::Faulted(JobError::Panicked(panic_message(payload.as_ref()))),
    };

    if let JobState::Faulted(err) = &terminal {
        debug!(job_id = %job.id(), error = %err, "job faulted");
    }
    job.settle(terminal);
    debug!(job_id = %job.id(), status = %job.status(), "job finished");
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::state::JobStatus;

    fn registry() -> JobRegistry<u32> {
        JobRegistry::new()
    }

    #[tokio::test]
    async fn job_is_listed_before_work_runs() {
        let registry = registry();
        let ran = Arc::new(AtomicBool::new(false));

        let flag = ran.clone();
        let job = registry.create_job("immediate", move |_| async move {
            flag.store(true, Ordering::SeqCst);
            Ok(1)
        });

        let listed: Vec<_> = registry.jobs().iter().map(Job::id).collect();
        assert_eq!(listed, vec![job.id()]);
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(job.status(), JobStatus::Running);

        assert_eq!(job.wait().await, JobState::Completed(1));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failed_work_faults_the_job() {
        let registry = registry();
        let job = registry.create_job("broken", |_| async { Err(JobError::failed("no route")) });

        let state = job.wait().await;
        assert_eq!(state.status(), JobStatus::Faulted);
        assert_eq!(state.error(), Some(&JobError::failed("no route")));
    }

    #[tokio::test]
    async fn cancellation_is_reported_as_canceled() {
        let registry = registry();
        let job = registry.create_job("waits for cancel", |token| async move {
            token.cancelled().await;
            Err(JobError::Canceled)
        });

        job.cancel();
        assert_eq!(job.wait().await, JobState::Canceled);
    }

    #[tokio::test]
    async fn cancelling_one_job_leaves_others_running() {
        let registry = registry();
        let make = |registry: &JobRegistry<u32>| {
            registry.create_job("parked", |token| async move {
                token.cancelled().await;
                Err(JobError::Canceled)
            })
        };
        let first = make(&registry);
        let second = make(&registry);

        first.cancel();
        first.wait().await;
        tokio::task::yield_now().await;

        assert_eq!(first.status(), JobStatus::Canceled);
        assert_eq!(second.status(), JobStatus::Running);
        assert!(!second.is_cancellation_requested());
        second.cancel();
    }

    #[tokio::test]
    async fn panicking_work_is_contained() {
        let registry = registry();
        let job = registry.create_job("explodes", |_| async {
            if true {
                panic!("engine crashed");
            }
            Ok(0)
        });

        match job.wait().await {
            JobState::Faulted(JobError::Panicked(msg)) => assert_eq!(msg, "engine crashed"),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn terminal_status_never_changes() {
        let registry = registry();
        let job = registry.create_job("quick", |_| async { Ok(9) });
        job.wait().await;

        for _ in 0..10 {
            tokio::task::yield_now().await;
            job.cancel();
            assert_eq!(job.status(), JobStatus::Completed);
        }
        assert_eq!(job.state(), JobState::Completed(9));
    }

    #[tokio::test]
    async fn try_get_consumes_terminal_jobs_once() {
        let registry = registry();
        let job = registry.create_job("done soon", |_| async { Ok(2) });
        job.wait().await;

        for _ in 0..3 {
            let peeked = registry.try_peek_job(job.id()).expect("peek never removes");
            assert_eq!(peeked.status(), JobStatus::Completed);
        }

        let taken = registry.try_get_job(job.id()).expect("first get returns the job");
        assert_eq!(taken.state(), JobState::Completed(2));
        assert!(registry.try_get_job(job.id()).is_none());
        assert!(registry.try_peek_job(job.id()).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn try_get_keeps_running_jobs() {
        let registry = registry();
        let gate = Arc::new(Notify::new());
        let release = gate.clone();
        let job = registry.create_job("gated", move |_| async move {
            release.notified().await;
            Ok(0)
        });

        assert!(registry.try_get_job(job.id()).is_some());
        assert!(registry.try_get_job(job.id()).is_some());
        assert_eq!(registry.len(), 1);

        gate.notify_one();
        job.wait().await;
        assert!(registry.try_get_job(job.id()).is_some());
        assert!(registry.try_get_job(job.id()).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_gets_remove_a_terminal_job_once() {
        const GETTERS: usize = 16;

        let registry = Arc::new(registry());
        let job = registry.create_job("contended", |_| async { Ok(5) });
        job.wait().await;

        let barrier = Arc::new(tokio::sync::Barrier::new(GETTERS));
        let handles: Vec<_> = (0..GETTERS)
            .map(|_| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                let id = job.id();
                tokio::spawn(async move {
                    barrier.wait().await;
                    registry.try_get_job(id)
                })
            })
            .collect();

        let mut found = 0;
        for handle in handles {
            if let Some(taken) = handle.await.unwrap() {
                assert_eq!(taken.state(), JobState::Completed(5));
                found += 1;
            }
        }

        assert_eq!(found, 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let registry = registry();
        assert!(registry.try_get_job(JobId::new()).is_none());
        assert!(registry.try_peek_job(JobId::new()).is_none());
    }

    #[tokio::test]
    async fn colliding_ids_are_regenerated() {
        let fixed = JobId::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry: JobRegistry<u32> = JobRegistry::with_id_source(Box::new(move || {
            // Candidates two and three collide with the tracked `fixed` id.
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                fixed
            } else {
                JobId::new()
            }
        }));

        let first = registry.create_job("first", |t| async move {
            t.cancelled().await;
            Err(JobError::Canceled)
        });
        let second = registry.create_job("second", |t| async move {
            t.cancelled().await;
            Err(JobError::Canceled)
        });

        assert_eq!(first.id(), fixed);
        assert_ne!(second.id(), fixed);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(registry.len(), 2);

        first.cancel();
        second.cancel();
    }

    #[tokio::test]
    async fn jobs_are_listed_oldest_first() {
        let registry = registry();
        let ids: Vec<_> = (0..5)
            .map(|i| registry.create_job(format!("job {i}"), |_| async { Ok(0) }).id())
            .collect();

        let listed: Vec<_> = registry.jobs().iter().map(Job::id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creation_loses_nothing() {
        const TASKS: usize = 8;
        const PER_TASK: usize = 25;

        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..TASKS)
            .map(|t| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    (0..PER_TASK)
                        .map(|i| {
                            registry
                                .create_job(format!("task {t} job {i}"), |token| async move {
                                    token.cancelled().await;
                                    Err(JobError::Canceled)
                                })
                                .id()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(ids.insert(id), "duplicate id {id}");
            }
        }

        let jobs = registry.jobs();
        assert_eq!(ids.len(), TASKS * PER_TASK);
        assert_eq!(jobs.len(), TASKS * PER_TASK);
        assert!(jobs.iter().all(|job| job.status() == JobStatus::Running));

        for job in jobs {
            job.cancel();
        }
    }
}
