//! Bounded exponential backoff for upstream fetches.

use std::future::Future;
use std::time::Duration;
use surge_watch_core::{FetchError, RetryConfig};
use tracing::debug;

/// Result of a retried operation.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, FetchError>,
    /// Attempts made, including the first
    pub attempts: u32,
}

impl<T> RetryOutcome<T> {
    /// Attempts beyond the first.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Exponential backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.multiplier.max(1.0),
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (1-based), capped at the max backoff.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Delay to wait after `err` before retry number `retry`.
    ///
    /// An explicit upstream delay (rate limiting) wins over the schedule.
    #[must_use]
    pub fn delay_for(&self, err: &FetchError, retry: u32) -> Duration {
        err.retry_delay().unwrap_or_else(|| self.backoff(retry))
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match op().await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts,
                    }
                }
                Err(err) if err.is_retryable() && attempts < self.max_attempts => {
                    let delay = self.delay_for(&err, attempts);
                    debug!(
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying fetch"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return RetryOutcome {
                        result: Err(err),
                        attempts,
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_attempts,
            initial_backoff_ms: 10,
            max_backoff_ms: 50,
            multiplier: 2.0,
        })
    }

    // ============================================
    // Schedule Tests
    // ============================================

    #[test]
    fn backoff_doubles_and_caps() {
        let p = policy(5);
        assert_eq!(p.backoff(1), Duration::from_millis(10));
        assert_eq!(p.backoff(2), Duration::from_millis(20));
        assert_eq!(p.backoff(3), Duration::from_millis(40));
        assert_eq!(p.backoff(4), Duration::from_millis(50));
        assert_eq!(p.backoff(40), Duration::from_millis(50));
    }

    #[test]
    fn rate_limit_delay_overrides_schedule() {
        let p = policy(3);
        assert_eq!(
            p.delay_for(&FetchError::rate_limit(2), 1),
            Duration::from_secs(2)
        );
        assert_eq!(
            p.delay_for(&FetchError::Network("x".into()), 2),
            Duration::from_millis(20)
        );
    }

    #[test]
    fn zero_attempts_is_treated_as_one() {
        assert_eq!(policy(0).max_attempts(), 1);
    }

    // ============================================
    // Execution Tests
    // ============================================

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let outcome = policy(3)
            .run(|| {
                let c = Arc::clone(&c);
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(FetchError::Network("reset".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(outcome.result, Ok(42));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.retries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget() {
        let outcome: RetryOutcome<()> = policy(2)
            .run(|| async { Err(FetchError::Timeout("slow".into())) })
            .await;
        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_stops_immediately() {
        let outcome: RetryOutcome<()> = policy(5)
            .run(|| async { Err(FetchError::api(404, "unknown contract")) })
            .await;
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.result, Err(FetchError::api(404, "unknown contract")));
    }
}
