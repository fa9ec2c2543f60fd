//! Rate-limit retry executor.
//!
//! A bounded loop with exponential backoff, so the maximum total wait is
//! known statically: base * (2^retries - 1). Only `RateLimited` is ever
//! retried; every other error propagates on the first attempt.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use super::http::ApiError;

/// Backoff policy. Each invocation of the executor is independent; the
/// policy is plain data and safe to share.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (0 means exactly one attempt)
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Run `request_fn`, retrying rate-limited responses with exponential
/// backoff (base, 2x base, 4x base, ...). The last error is propagated
/// once retries are exhausted.
pub async fn execute_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    mut request_fn: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0u32;
    loop {
        match request_fn().await {
            Err(ApiError::RateLimited) if attempt < policy.max_retries => {
                let delay = policy.base_delay * 2u32.saturating_pow(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
                sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Caller-side deadline around a retry sequence. An in-flight backoff is
/// abandoned once the deadline passes.
pub async fn execute_with_deadline<T, F, Fut>(
    deadline: Duration,
    policy: RetryPolicy,
    request_fn: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    tokio::time::timeout(deadline, execute_with_retry(policy, request_fn))
        .await
        .map_err(|_| ApiError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1000),
        }
    }

    /// Request function failing with RateLimited `failures` times, then
    /// succeeding with the attempt count.
    fn flaky(failures: u32) -> (Arc<AtomicU32>, impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<u32, ApiError>> + Send>>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let f = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                if n <= failures {
                    Err(ApiError::RateLimited)
                } else {
                    Ok(n)
                }
            }) as std::pin::Pin<Box<dyn Future<Output = Result<u32, ApiError>> + Send>>
        };
        (calls, f)
    }

    #[tokio::test(start_paused = true)]
    async fn backs_off_1s_then_2s_before_third_attempt() {
        let (calls, f) = flaky(2);
        let start = Instant::now();
        let result = execute_with_retry(policy(3), f).await.unwrap();
        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_propagates_rate_limited() {
        let (calls, f) = flaky(u32::MAX);
        let start = Instant::now();
        let result: Result<u32, _> = execute_with_retry(policy(3), f).await;
        assert!(matches!(result, Err(ApiError::RateLimited)));
        // initial attempt + 3 retries, waits of 1s, 2s, 4s
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_millis(7000));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_one_attempt() {
        let (calls, f) = flaky(u32::MAX);
        let result: Result<u32, _> = execute_with_retry(policy(0), f).await;
        assert!(matches!(result, Err(ApiError::RateLimited)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_rate_limit_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<u32, _> = execute_with_retry(policy(3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::Server { status: 500 }) }
        })
        .await;
        assert!(matches!(result, Err(ApiError::Server { status: 500 })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_abandons_the_retry_sequence() {
        let (calls, f) = flaky(u32::MAX);
        let start = Instant::now();
        let result: Result<u32, _> =
            execute_with_deadline(Duration::from_millis(2500), policy(10), f).await;
        assert!(matches!(result, Err(ApiError::Timeout)));
        assert_eq!(start.elapsed(), Duration::from_millis(2500));
        // attempts at t=0 and t=1000; the 2s backoff crosses the deadline
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
