//! Retry configuration for sync uploads.

use std::time::Duration;

use tracing::warn;

pub const MAX_ATTEMPTS_VAR: &str = "HEADLESS_SYNC_MAX_ATTEMPTS";
pub const RETRY_DELAY_VAR: &str = "HEADLESS_SYNC_RETRY_DELAY_MS";
pub const ATTEMPT_TIMEOUT_VAR: &str = "HEADLESS_SYNC_ATTEMPT_TIMEOUT_MS";

/// Retry policy for a single upload.
///
/// The delay is fixed; there is no backoff or jitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    /// Configured attempt budget. `0` still allows one attempt.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub retry_delay: Duration,
    /// Abandon an attempt that runs longer than this. `None` waits forever.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            attempt_timeout: None,
        }
    }
}

impl RetrySettings {
    /// Fixed-delay policy without an attempt timeout.
    pub fn fixed(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts,
            retry_delay,
            attempt_timeout: None,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Number of attempts the controller will actually make at most.
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Settings from the process environment, falling back per variable.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Settings from an arbitrary variable lookup.
    ///
    /// Unset variables keep their default. Unparseable values are logged and
    /// also keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let max_attempts = parse_var(&lookup, MAX_ATTEMPTS_VAR)
            .map(|n: i64| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
            .unwrap_or(defaults.max_attempts);

        let retry_delay = parse_var(&lookup, RETRY_DELAY_VAR)
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_delay);

        let attempt_timeout = match parse_var::<u64>(&lookup, ATTEMPT_TIMEOUT_VAR) {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => defaults.attempt_timeout,
        };

        Self {
            max_attempts,
            retry_delay,
            attempt_timeout,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "invalid sync retry setting; using default");
            None
        }
    }
}
