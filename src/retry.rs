//! Bounded retries with exponential backoff, for calls that can be
//! safely repeated.

use anyhow::Result;
use core::time::Duration;
use std::future::Future;
use tokio::time::sleep;
use tracing::warn;

/// The base of the exponential backoff sequence.
const BACKOFF_BASE: u64 = 2;

/// The maximum amount of milliseconds to sleep between attempts. Set
/// to the equivalent of 20 minutes.
const MAX_SLEEP: u64 = 1200000;

/// How many times, and how patiently, an idempotent call is
/// attempted.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts. Zero is treated as one.
    pub attempts: u32,

    /// Milliseconds to wait after the first failure.
    pub base_lapse: u64,
}

impl RetryPolicy {
    /// The lapse to wait after the given (zero-based) failed attempt.
    fn lapse(&self, attempt: u32) -> Duration {
        Duration::from_millis(std::cmp::min(
            self.base_lapse
                .saturating_mul(BACKOFF_BASE.saturating_pow(attempt)),
            MAX_SLEEP,
        ))
    }

    /// Run `operation` until it succeeds or the attempts are
    /// exhausted, returning the last error in the latter case. Must
    /// only be used for idempotent operations.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < attempts => {
                    warn!(
                        "Attempt {} of {} to {} failed: {:?}",
                        attempt + 1,
                        attempts,
                        what,
                        e
                    );
                    sleep(self.lapse(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_lapse: 0,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = policy(3)
            .run("read", || {
                calls += 1;
                let call = calls;
                async move {
                    if call < 3 {
                        Err(anyhow!("throttled"))
                    } else {
                        Ok(call)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_last_attempt() {
        let mut calls = 0;
        let result: Result<()> = policy(2)
            .run("read", || {
                calls += 1;
                async { Err(anyhow!("unavailable")) }
            })
            .await;
        assert_eq!(result.unwrap_err().to_string(), "unavailable");
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let mut calls = 0;
        let result: Result<()> = policy(0)
            .run("read", || {
                calls += 1;
                async { Err(anyhow!("unavailable")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn lapse_grows_and_is_capped() {
        let policy = RetryPolicy {
            attempts: 40,
            base_lapse: 300,
        };
        assert_eq!(policy.lapse(0), Duration::from_millis(300));
        assert_eq!(policy.lapse(2), Duration::from_millis(1200));
        assert_eq!(policy.lapse(30), Duration::from_millis(MAX_SLEEP));
    }
}
