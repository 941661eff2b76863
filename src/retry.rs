//! Bounded retry with exponential backoff on transient store errors.

use crate::error::{Error, Result, StoreError};

use std::{future::Future, time::Duration};

/// How a single store call is retried.
///
/// Before retry `r` (1-indexed) the executor sleeps `base_delay^r` time units.
///
/// ```rust
/// use dynamodb_model::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.backoff(1), Duration::from_secs(2));
/// assert_eq!(policy.backoff(3), Duration::from_secs(8));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Base of the exponential backoff, in `time_unit`s.
    pub base_delay: f64,
    /// Length of one backoff time unit.
    pub time_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: 2.0,
            time_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy that surfaces the first error.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Sleep before retry `retry` (1-indexed).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let factor = self.base_delay.max(0.0).powi(exponent);
        Duration::try_from_secs_f64(self.time_unit.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of retries.
    ///
    /// Permanent errors surface immediately. Transient errors are retried up
    /// to `max_retries` times; the last one surfaces once retries are spent.
    /// Both surface as [`Error::StoreOperation`] tagged with `operation`.
    pub async fn execute<F, Fut, R>(&self, operation: &'static str, mut op: F) -> Result<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<R, StoreError>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(output) => return Ok(output),
                Err(err) if err.is_transient() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.backoff(retry);
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        operation,
                        code = %err.code,
                        retry,
                        ?delay,
                        "transient store error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(Error::store(operation, err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn throttled() -> StoreError {
        StoreError::new("ProvisionedThroughputExceededException", "slow down")
    }

    #[rstest]
    #[case::first(1, Duration::from_secs(2))]
    #[case::second(2, Duration::from_secs(4))]
    #[case::third(3, Duration::from_secs(8))]
    fn test_backoff(#[case] retry: u32, #[case] expected: Duration) {
        assert_eq!(RetryPolicy::default().backoff(retry), expected);
    }

    #[test]
    fn test_backoff_scales_with_time_unit() {
        let policy = RetryPolicy {
            time_unit: Duration::from_millis(10),
            ..Default::default()
        };
        assert_eq!(policy.backoff(2), Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_exhaust_retries() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: 2.0,
            time_unit: Duration::from_secs(1),
        };
        let start = Instant::now();
        let result: Result<()> = policy
            .execute("GetItem", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(throttled()) }
            })
            .await;
        // 2^1 + 2^2 + 2^3
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(14), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(15), "{elapsed:?}");
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        match result {
            Err(Error::StoreOperation {
                operation, code, ..
            }) => {
                assert_eq!(operation, "GetItem");
                assert_eq!(code, "ProvisionedThroughputExceededException");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<()> = RetryPolicy::default()
            .execute("PutItem", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::new("ValidationException", "bad")) }
            })
            .await;
        assert!(matches!(result, Err(Error::StoreOperation { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_error() {
        let attempts = AtomicU32::new(0);
        let start = Instant::now();
        let result = RetryPolicy::default()
            .execute("Query", || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(StoreError::new("ThrottlingException", "busy"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(7), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_no_retries() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = RetryPolicy::none()
            .execute("Scan", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(throttled()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
