//! Background job tracking.
//!
//! ## Design
//!
//! - A job wraps one cancellable future and exposes its status by id
//! - Status is a projection of an explicit state that the job's driver task
//!   sets exactly once; terminal states never revert to `Running`
//! - The registry hands out a job's terminal result once: the first
//!   `try_get_job` that sees a finished job removes it, `try_peek_job` never does
//!
//! ## Components
//!
//! - `JobRegistry`: creates jobs and looks them up
//! - `Job`: cloneable handle (status, cancellation, wait)
//! - `JobState` / `JobStatus` / `JobError`: outcome model

pub mod job;
pub mod registry;
pub mod state;

#[cfg(test)]
mod proptests;

pub use job::{Job, JobDescriptor};
pub use registry::{IdSource, JobRegistry};
pub use state::{JobError, JobState, JobStatus};
