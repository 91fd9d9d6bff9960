//! Shared error model.

use thiserror::Error;

/// Result type used by the shared primitives.
pub type ControlResult<T> = Result<T, ControlError>;

/// Control-plane error for malformed input.
///
/// Operational failures (uploads, world hosts) have their own error types in
/// the crates that own them; this enum only covers deterministic rejections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A request failed validation.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl ControlError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
