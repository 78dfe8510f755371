//! Single-request error type for retry classification.

use std::fmt;
use std::time::Duration;

/// Error returned by a single GET (curl failure, HTTP error, or user abort).
/// Used so we can classify and decide retries before giving up on a URL.
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, DNS, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http {
        code: u32,
        /// `Retry-After` in seconds, when the server sent one.
        retry_after: Option<Duration>,
    },
    /// The interrupt flag was set during the transfer or a backoff sleep.
    Interrupted,
}

impl FetchError {
    /// Bare HTTP status error without a `Retry-After` hint.
    pub fn http(code: u32) -> Self {
        FetchError::Http {
            code,
            retry_after: None,
        }
    }

    /// True for transport-level failures (no HTTP status was received).
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Curl(_))
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http { code, .. } => write!(f, "HTTP {}", code),
            FetchError::Interrupted => write!(f, "interrupted by user"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            FetchError::Http { .. } | FetchError::Interrupted => None,
        }
    }
}
