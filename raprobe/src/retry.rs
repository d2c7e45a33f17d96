//! Retry with exponential backoff and jitter.
//!
//! Every transient probe goes through [`retry`]. The combinator returns
//! `Option<T>` rather than a `Result`: exhausting the attempts yields
//! `None`, which callers must treat as "field unknown" — never as fatal.
//! The jitter keeps concurrently failing stations from producing
//! synchronized retry storms against the same external service.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Backoff parameters for one probe category.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each failure
    pub multiplier: f64,
    /// Upper bound of the uniform random jitter added to each delay
    pub jitter: Duration,
}

impl RetryPolicy {
    /// Policy with the default backoff shape (1s base, doubling, 100ms
    /// jitter bound).
    pub const fn new(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: Duration::from_millis(100),
        }
    }

    /// Override the delay before the second attempt.
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Override the jitter bound.
    pub const fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to sleep after the given (1-based) failed attempt.
    fn delay_after(&self, attempt: u32) -> Duration {
        let backoff = self
            .base_delay
            .mul_f64(self.multiplier.powi(attempt.saturating_sub(1) as i32));
        let jitter = self.jitter.mul_f64(rand::random::<f64>());
        backoff + jitter
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Returns `Some(value)` on the first success and `None` once every attempt
/// has failed. Each failure is logged; the final one at `warn` level so a
/// station degrading to "unknown" is visible in the run log.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    for attempt in 1..=policy.attempts {
        match op().await {
            Ok(value) => return Some(value),
            Err(e) if attempt == policy.attempts => {
                warn!("{what}: giving up after {attempt} attempt(s): {e}");
                return None;
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                debug!("{what}: attempt {attempt} failed ({e}), retrying in {delay:?}");
                tokio::time::sleep(delay).await;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(Duration::ZERO)
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let result = retry(&fast_policy(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, std::io::Error>(42) }
        })
        .await;
        assert_eq!(result, Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_second_attempt() {
        let calls = AtomicU32::new(0);
        let result = retry(&fast_policy(3), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(std::io::Error::other("first try fails"))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_none() {
        let calls = AtomicU32::new(0);
        let result: Option<u32> = retry(&fast_policy(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, _>(std::io::Error::other("always fails")) }
        })
        .await;
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(4)
            .with_base_delay(Duration::from_secs(1))
            .with_jitter(Duration::ZERO);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let policy = RetryPolicy::new(2)
            .with_base_delay(Duration::from_secs(1))
            .with_jitter(Duration::from_millis(100));
        for _ in 0..50 {
            let delay = policy.delay_after(1);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_millis(1100));
        }
    }
}
