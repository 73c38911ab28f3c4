// Retry policy for gateway calls: random exponential backoff
use std::future::Future;
use std::time::Duration;
use log::warn;
use rand::Rng;

use super::error::CompletionError;

pub const MAX_RETRY_ATTEMPTS: u32 = 5;
pub const MIN_WAIT: Duration = Duration::from_secs(30);
pub const MAX_WAIT: Duration = Duration::from_secs(300);

#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            min_wait: MIN_WAIT,
            max_wait: MAX_WAIT,
            multiplier: 1.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_wait_bounds(mut self, min_wait: Duration, max_wait: Duration) -> Self {
        self.min_wait = min_wait;
        self.max_wait = max_wait.max(min_wait);
        self
    }

    /// Wait before the attempt following failed attempt number `attempt` (1-based).
    ///
    /// Uniform in `[min_wait, clamp(multiplier * 2^(attempt-1), min_wait, max_wait)]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let min = self.min_wait.as_secs_f64();
        let max = self.max_wait.as_secs_f64().max(min);
        let exp = self.multiplier * 2f64.powi(attempt.saturating_sub(1).min(62) as i32);
        let high = exp.clamp(min, max);
        if high <= min {
            return self.min_wait;
        }
        Duration::from_secs_f64(rand::rng().random_range(min..=high))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or attempts run out.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, CompletionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CompletionError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let wait = self.backoff(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:.1}s",
                        attempt, max_attempts, e, wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
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
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::none()
            .with_max_attempts(max_attempts)
            .with_wait_bounds(Duration::from_millis(1), Duration::from_millis(5))
    }

    #[test]
    fn test_default_bounds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.min_wait, Duration::from_secs(30));
        assert_eq!(policy.max_wait, Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 1..=12 {
            let wait = policy.backoff(attempt);
            assert!(wait >= MIN_WAIT, "attempt {} waited {:?}", attempt, wait);
            assert!(wait <= MAX_WAIT, "attempt {} waited {:?}", attempt, wait);
        }
        // 2^0..2^4 seconds are all below the floor
        assert_eq!(policy.backoff(1), MIN_WAIT);
        assert_eq!(policy.backoff(5), MIN_WAIT);
    }

    #[tokio::test]
    async fn test_retries_transient_until_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CompletionError::Connection("refused".to_string())) }
            })
            .await;
        assert!(matches!(result, Err(CompletionError::Connection(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_shape_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(5)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CompletionError::MissingField("message.assistant")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(5)
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(CompletionError::Timeout("slow".to_string()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
