//! World operations exposed as tracked jobs.

use std::sync::Arc;

use tracing::{debug, info, warn};

use headless_core::SessionId;
use headless_jobs::{Job, JobError, JobRegistry};
use headless_sync::{CompletionSignal, RetryController, UploadOperation};

use crate::error::WorldError;
use crate::host::WorldHost;
use crate::params::{WorldDescriptor, WorldStartParameters};

/// Runs world lifecycle operations through a [`JobRegistry`].
///
/// Every operation returns immediately with a running job; failures surface
/// as the job's terminal state, never as an error from the call itself.
pub struct WorldController<H: ?Sized> {
    registry: Arc<JobRegistry<WorldDescriptor>>,
    host: Arc<H>,
    retry: RetryController,
}

impl<H: WorldHost + ?Sized + 'static> WorldController<H> {
    pub fn new(
        host: Arc<H>,
        registry: Arc<JobRegistry<WorldDescriptor>>,
        retry: RetryController,
    ) -> Self {
        Self { registry, host, retry }
    }

    pub fn registry(&self) -> &Arc<JobRegistry<WorldDescriptor>> {
        &self.registry
    }

    /// Start a world as a job described as `"Starting world <name>"`.
    ///
    /// Invalid parameters fault the job rather than failing the call.
    pub fn start_world(&self, params: WorldStartParameters) -> Job<WorldDescriptor> {
        let host = Arc::clone(&self.host);
        let description = format!("Starting world {}", params.name);

        self.registry.create_job(description, move |cancel| async move {
            params.validate().map_err(WorldError::from)?;
            let session = host.start_world(params, cancel).await?;
            info!(
                session_id = %session.session_id,
                name = %session.parameters.name,
                "world started"
            );
            Ok::<_, JobError>(session.descriptor())
        })
    }

    pub fn restart_world(&self, session_id: SessionId) -> Job<WorldDescriptor> {
        let host = Arc::clone(&self.host);

        self.registry
            .create_job(format!("Restarting world {session_id}"), move |cancel| async move {
                let session = host.restart_world(session_id, cancel).await?;
                info!(session_id = %session.session_id, "world restarted");
                Ok::<_, JobError>(session.descriptor())
            })
    }

    /// Stop a world. The job's output is the session as it was when stopped.
    pub fn stop_world(&self, session_id: SessionId) -> Job<WorldDescriptor> {
        let host = Arc::clone(&self.host);

        self.registry
            .create_job(format!("Stopping world {session_id}"), move |_cancel| async move {
                let session = host.stop_world(session_id).await?;
                info!(session_id = %session.session_id, "world stopped");
                Ok::<_, JobError>(session.descriptor())
            })
    }

    /// Save a world by driving `upload` through the retry controller.
    ///
    /// The job waits on the upload's completion signal; individual attempts
    /// are not visible through the registry. Cancelling the job stops further
    /// attempts but lets a pending retry delay run out first.
    pub fn save_world(
        &self,
        session_id: SessionId,
        upload: Arc<dyn UploadOperation>,
    ) -> Job<WorldDescriptor> {
        let host = Arc::clone(&self.host);
        let retry = self.retry.clone();

        self.registry
            .create_job(format!("Saving world {session_id}"), move |cancel| async move {
                let session = host.session(session_id).await?;

                let signal = CompletionSignal::new();
                let driver = {
                    let signal = signal.clone();
                    tokio::spawn(async move { retry.run(upload.as_ref(), &signal, &cancel).await })
                };

                let outcome = signal.wait().await;
                match driver.await {
                    Ok(report) => debug!(
                        %session_id,
                        attempts = report.attempts,
                        retries = report.retries,
                        "world save upload finished"
                    ),
                    Err(err) => {
                        warn!(%session_id, error = %err, "world save driver did not finish")
                    }
                }

                outcome.into_job_result()?;
                Ok::<_, JobError>(session.descriptor())
            })
    }
}
