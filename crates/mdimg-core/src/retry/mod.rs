//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures, retryable status codes) and capped exponential
//! backoff so the downloader applies one consistent, configurable policy to
//! every GET.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy, DEFAULT_RETRYABLE_STATUS_CODES};
pub use run::run_with_retry;
