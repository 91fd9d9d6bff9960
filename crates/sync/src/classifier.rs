//! Decides whether a failed upload attempt is worth repeating.
//!
//! Rules are evaluated in order and the first match wins:
//!
//! 1. a conflict is permanent
//! 2. a preprocessing failure is permanent
//! 3. rate limiting (429) is transient, even though it is a 4xx
//! 4. any other client error (4xx) is permanent
//! 5. server errors that a retry cannot fix (501, 505, 507, 508, 510, 511) are permanent
//! 6. everything else is transient
//!
//! Rules 1 and 2 always look at the message. Rules 3 to 5 use the structured
//! status when the failure carries one and fall back to the message text only
//! when it does not.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// A failed upload attempt as reported by the upload primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", status_suffix(.status))]
pub struct UploadFailure {
    /// HTTP status of the failed request, when the primitive surfaced one.
    pub status: Option<u16>,
    pub message: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

impl UploadFailure {
    /// Failure known only by its diagnostic text.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        classify(self).is_retryable()
    }
}

/// Outcome of classifying one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    Retry,
    GiveUp,
}

impl RetryVerdict {
    pub fn is_retryable(self) -> bool {
        matches!(self, RetryVerdict::Retry)
    }
}

const TERMINAL_SERVER_STATUSES: [u16; 6] = [501, 505, 507, 508, 510, 511];

static RATE_LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b429\b|too many requests|rate[ -]?limit").expect("valid regex")
});

static CLIENT_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b4\d{2}\b").expect("valid regex"));

static TERMINAL_SERVER_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:501|505|507|508|510|511)\b").expect("valid regex")
});

/// Lowercase and collapse runs of whitespace to single spaces.
fn normalize(message: &str) -> String {
    message
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classify a failed attempt.
pub fn classify(failure: &UploadFailure) -> RetryVerdict {
    let text = normalize(&failure.message);

    if text.contains("conflict") || text.contains("preprocessing failed") {
        return RetryVerdict::GiveUp;
    }

    let permanent = match failure.status {
        Some(429) => false,
        Some(code) if (400..=499).contains(&code) => true,
        Some(code) => TERMINAL_SERVER_STATUSES.contains(&code),
        None if RATE_LIMIT.is_match(&text) => false,
        None => CLIENT_ERROR.is_match(&text) || TERMINAL_SERVER_ERROR.is_match(&text),
    };

    if permanent {
        RetryVerdict::GiveUp
    } else {
        RetryVerdict::Retry
    }
}

/// Classify a failure known only by its diagnostic text.
pub fn classify_message(message: &str) -> RetryVerdict {
    classify(&UploadFailure::new(message))
}
