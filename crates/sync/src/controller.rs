//! Bounded, fixed-delay retry loop around one upload.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use headless_core::panic_message;

use crate::classifier::{UploadFailure, classify};
use crate::settings::RetrySettings;
use crate::signal::{CompletionSignal, FailureReason, UploadOutcome};

/// One attempt of an upload, as provided by the sync subsystem.
///
/// `attempt` is 1-based. `Ok(flag)` ends the upload with that success flag;
/// `Err` is classified to decide whether another attempt follows.
#[async_trait]
pub trait UploadOperation: Send + Sync {
    async fn attempt(&self, attempt: u32) -> Result<bool, UploadFailure>;
}

#[async_trait]
impl<F, Fut> UploadOperation for F
where
    F: Fn(u32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, UploadFailure>> + Send,
{
    async fn attempt(&self, attempt: u32) -> Result<bool, UploadFailure> {
        self(attempt).await
    }
}

/// What happened during one [`RetryController::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Attempts started.
    pub attempts: u32,
    /// Inter-attempt delays taken.
    pub retries: u32,
    /// Whether this run resolved the signal, rather than finding it resolved.
    pub resolved: bool,
    /// The outcome the completion signal holds.
    pub outcome: UploadOutcome,
}

/// Drives uploads through [`RetrySettings`].
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    settings: RetrySettings,
}

impl RetryController {
    pub fn new(settings: RetrySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// Run `op` until it succeeds, fails permanently, runs out of attempts,
    /// or `cancel` is observed between attempts.
    ///
    /// `cancel` is only checked before starting an attempt. A running attempt
    /// and the delay after a failure are never interrupted by it. `signal` is
    /// resolved before this returns, unless something else resolved it first.
    pub async fn run<O>(
        &self,
        op: &O,
        signal: &CompletionSignal,
        cancel: &CancellationToken,
    ) -> UploadReport
    where
        O: UploadOperation + ?Sized,
    {
        let max_attempts = self.settings.effective_max_attempts();
        let mut attempts = 0u32;
        let mut retries = 0u32;

        let stopped = loop {
            if cancel.is_cancelled() {
                break UploadOutcome::failed(
                    FailureReason::Canceled,
                    format!("upload canceled after {attempts} attempt(s)"),
                );
            }

            attempts += 1;
            let failure = match self.attempt(op, attempts).await {
                Ok(success) => break UploadOutcome::Completed { success },
                Err(failure) => failure,
            };

            // `max_attempts` is the effective budget; a configured 0 still allows one.
            warn!(
                attempt = attempts,
                max_attempts,
                configured_max_attempts = self.settings.max_attempts,
                error = %failure,
                "upload attempt failed"
            );

            if !classify(&failure).is_retryable() {
                break UploadOutcome::failed(
                    FailureReason::Permanent,
                    format!("upload failed permanently: {failure}"),
                );
            }
            if attempts >= max_attempts {
                break UploadOutcome::failed(
                    FailureReason::Exhausted,
                    format!("upload failed after {attempts} attempts: {failure}"),
                );
            }

            tokio::time::sleep(self.settings.retry_delay).await;
            retries += 1;
        };

        let resolved = signal.resolve(stopped.clone());
        match &stopped {
            _ if !resolved => {
                debug!(
                    attempts,
                    retries, "upload finished after the signal was already resolved"
                );
            }
            UploadOutcome::Completed { success } => {
                info!(attempts, retries, success, "upload resolved");
            }
            UploadOutcome::Failed { reason, message } => {
                error!(attempts, retries, ?reason, %message, "upload resolved as failed");
            }
        }

        UploadReport {
            attempts,
            retries,
            resolved,
            outcome: signal.outcome().unwrap_or(stopped),
        }
    }

    /// One attempt with panic containment and the optional timeout applied.
    async fn attempt<O>(&self, op: &O, attempt: u32) -> Result<bool, UploadFailure>
    where
        O: UploadOperation + ?Sized,
    {
        let guarded = AssertUnwindSafe(op.attempt(attempt)).catch_unwind();
        let result = match self.settings.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(result) => result,
                Err(_) => return Err(timed_out(limit)),
            },
            None => guarded.await,
        };

        result.unwrap_or_else(|payload| {
            Err(UploadFailure::new(format!(
                "upload attempt panicked: {}",
                panic_message(payload.as_ref())
            )))
        })
    }
}

fn timed_out(limit: Duration) -> UploadFailure {
    UploadFailure::new(format!("upload attempt timed out after {}ms", limit.as_millis()))
}
