use crate::config::RetryConfig;
use std::time::Duration;

/// Status codes retried by default: throttling and transient server errors.
pub const DEFAULT_RETRYABLE_STATUS_CODES: &[u16] = &[429, 500, 502, 503, 504];

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// Configured retryable status that is not throttling (typically 5xx).
    RetryableStatus(u16),
    /// Any other error (not retried).
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Capped exponential backoff for idempotent GETs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (3 → at most 4 requests per URL).
    pub max_retries: u32,
    /// Status codes that are worth retrying.
    pub retryable_status_codes: Vec<u16>,
    /// Delay before the first retry; doubled for each further retry.
    pub backoff_base: Duration,
    /// Upper bound on any single backoff delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.to_vec(),
            backoff_base: Duration::from_secs(1),
            max_backoff: Duration::from_secs(120),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            retryable_status_codes: cfg.retryable_status_codes.clone(),
            backoff_base: Duration::try_from_secs_f64(cfg.backoff_base_secs)
                .unwrap_or(Duration::ZERO),
            max_backoff: Duration::from_secs(cfg.max_backoff_secs),
        }
    }
}

impl RetryPolicy {
    /// Decide whether to retry after the given failed attempt.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when the error is not retryable or the retry budget is spent.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt > self.max_retries {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::RetryableStatus(_) => RetryDecision::RetryAfter(self.backoff(attempt)),
        }
    }

    /// `backoff_base * 2^(attempt-1)`, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(exp).min(self.max_backoff)
    }
}
