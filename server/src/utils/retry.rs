//! Async retry with exponential backoff

use std::future::Future;
use std::time::Duration;

/// Backoff schedule: `max_retries` retries after the first attempt, starting
/// at `base_delay` and doubling each time
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent. The last error is returned on failure.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    policy: RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut retry = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if retry >= policy.max_retries || !is_retryable(&e) {
                    return Err(e);
                }
                retry += 1;
                let delay = policy.delay_for(retry);
                tracing::warn!(
                    error = %e,
                    retry,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_success_on_first_try() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(fast(3), |_: &&str| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, &str>(7)
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_retry() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(fast(1), |_: &&str| true, || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("transient")
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(fast(2), |_: &&str| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("persistent")
        })
        .await;
        assert_eq!(result, Err("persistent"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(fast(5), |e: &&str| *e != "bad request", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("bad request")
        })
        .await;
        assert_eq!(result, Err("bad request"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
