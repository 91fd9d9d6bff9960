//! Resilient record and asset sync uploads.
//!
//! An upload is attempted up to `RetrySettings::max_attempts` times with a
//! fixed delay in between. Each failure goes through the classifier; permanent
//! failures end the upload immediately. Whatever happens, the upload's
//! [`CompletionSignal`] ends up resolved exactly once.

pub mod classifier;
pub mod controller;
pub mod settings;
pub mod signal;

pub use classifier::{RetryVerdict, UploadFailure, classify, classify_message};
pub use controller::{RetryController, UploadOperation, UploadReport};
pub use settings::RetrySettings;
pub use signal::{CompletionSignal, FailureReason, UploadOutcome};
