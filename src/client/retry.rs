// Copyright (c) 2025 - Cowboy AI, Inc.
//! Exponential backoff for transient broker failures
//!
//! Connection errors and 5xx responses are retried; everything else is
//! returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::TopologyResult;

/// Retry policy shared by every request of a client
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32) as i32;
        let delay = self.initial_backoff.as_nanos() as f64 * self.multiplier.powi(exponent);
        let capped = delay.min(self.max_backoff.as_nanos() as f64);
        Duration::from_nanos(capped.round() as u64)
    }

    /// Run `attempt` until it succeeds, fails permanently, or retries run out
    ///
    /// A connectivity error surfaced after the last retry carries the total
    /// number of attempts.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> TopologyResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TopologyResult<T>>,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempts <= self.max_retries => {
                    let delay = self.backoff(attempts);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation,
                        attempts,
                        self.max_retries + 1,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err.with_attempts(attempts)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TopologyError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(10), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast(3)
            .run("GET /api/overview", || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TopologyError::connectivity("connection refused"))
                } else {
                    Ok("ready")
                }
            })
            .await;

        assert_eq!(result, Ok("ready"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: TopologyResult<()> = fast(2)
            .run("PUT queue", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TopologyError::connectivity("HTTP 503"))
            })
            .await;

        assert_eq!(
            result,
            Err(TopologyError::Connectivity {
                attempts: 3,
                message: "HTTP 503".to_string()
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: TopologyResult<()> = fast(5)
            .run("PUT queue", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TopologyError::Rejected {
                    operation: "PUT queue".to_string(),
                    status: 401,
                    message: "unauthorized".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(TopologyError::Rejected { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
