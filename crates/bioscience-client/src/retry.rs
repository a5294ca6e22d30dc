//! Retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use bioscience_common::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts after the first one. Zero disables retrying.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
    /// Retry permanent failures (4xx, decode errors) as well as transient ones.
    pub retry_all_errors: bool,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::with_retries(0)
    }

    /// `n` retries with 1s, 2s, 4s, ... delays capped at 30s.
    pub fn with_retries(n: u32) -> Self {
        Self {
            max_retries: n,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
            retry_all_errors: false,
        }
    }

    pub fn retry_all_errors(mut self) -> Self {
        self.retry_all_errors = true;
        self
    }

    fn should_retry(&self, err: &ApiError, attempt: u32) -> bool {
        attempt < self.max_retries && (self.retry_all_errors || err.is_retryable())
    }

    /// Delay before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy's
/// retries are used up. Only transient errors are retried unless the policy
/// says otherwise.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !policy.should_retry(&e, attempt) {
                    return Err(e);
                }
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = RetryPolicy::with_retries(3);
        assert_eq!(p.backoff(0), Duration::from_secs(1));
        assert_eq!(p.backoff(1), Duration::from_secs(2));
        assert_eq!(p.backoff(2), Duration::from_secs(4));
        assert_eq!(p.backoff(10), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retry_exactly_max_times() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&RetryPolicy::with_retries(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::Transport("down".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&RetryPolicy::with_retries(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::from_status(404, None)) }
        })
        .await;
        assert_eq!(result.unwrap_err().status(), Some(404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryPolicy::with_retries(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 { Err(ApiError::Timeout(30)) } else { Ok(n) }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_all_errors_retries_client_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::with_retries(3).retry_all_errors();
        let _: Result<(), _> = with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::from_status(404, None)) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_no_retry_policy_runs_once() {
        let calls = AtomicU32::new(0);
        let _: Result<(), _> = with_retry(&RetryPolicy::none(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::Transport("down".into())) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
