//! Retry loop: run a request until success or policy says stop.

use super::classify;
use super::error::FetchError;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use crate::control::InterruptFlag;

/// Runs a closure until it succeeds or the retry policy says to stop.
///
/// On retryable failure, sleeps for the backoff duration (or the server's
/// `Retry-After` when throttled, capped at `max_backoff`) then tries again.
/// The sleep watches `interrupt`, returning `FetchError::Interrupted` early.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    interrupt: &InterruptFlag,
    mut f: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        if interrupt.is_set() {
            return Err(FetchError::Interrupted);
        }
        match f() {
            Ok(v) => return Ok(v),
            Err(FetchError::Interrupted) => return Err(FetchError::Interrupted),
            Err(e) => {
                let kind = classify::classify(&e, policy);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(backoff) => {
                        let delay = match (&e, kind) {
                            (
                                FetchError::Http {
                                    retry_after: Some(ra),
                                    ..
                                },
                                ErrorKind::Throttled,
                            ) => (*ra).min(policy.max_backoff),
                            _ => backoff,
                        };
                        tracing::debug!(
                            attempt,
                            ?kind,
                            delay_ms = delay.as_millis() as u64,
                            "retrying after error: {}",
                            e
                        );
                        interrupt
                            .sleep(delay)
                            .map_err(|_| FetchError::Interrupted)?;
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_base: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn succeeds_after_transient_errors() {
        let mut calls = 0;
        let r = run_with_retry(&fast_policy(3), &InterruptFlag::new(), || {
            calls += 1;
            if calls < 3 {
                Err(FetchError::http(503))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(r.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut calls = 0;
        let r: Result<(), _> = run_with_retry(&fast_policy(3), &InterruptFlag::new(), || {
            calls += 1;
            Err(FetchError::http(503))
        });
        assert!(matches!(r, Err(FetchError::Http { code: 503, .. })));
        assert_eq!(calls, 4);
    }

    #[test]
    fn non_retryable_fails_immediately() {
        let mut calls = 0;
        let r: Result<(), _> = run_with_retry(&fast_policy(3), &InterruptFlag::new(), || {
            calls += 1;
            Err(FetchError::http(404))
        });
        assert!(r.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn retry_after_is_capped() {
        let policy = RetryPolicy {
            max_retries: 1,
            backoff_base: Duration::from_secs(60),
            max_backoff: Duration::from_millis(20),
            ..RetryPolicy::default()
        };
        let mut calls = 0;
        let start = Instant::now();
        let r = run_with_retry(&policy, &InterruptFlag::new(), || {
            calls += 1;
            if calls == 1 {
                Err(FetchError::Http {
                    code: 429,
                    retry_after: Some(Duration::from_secs(3600)),
                })
            } else {
                Ok(())
            }
        });
        assert!(r.is_ok());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn interrupt_stops_loop() {
        let flag = InterruptFlag::new();
        flag.trigger();
        let mut calls = 0;
        let r: Result<(), _> = run_with_retry(&fast_policy(3), &flag, || {
            calls += 1;
            Ok(())
        });
        assert!(matches!(r, Err(FetchError::Interrupted)));
        assert_eq!(calls, 0);
    }
}
