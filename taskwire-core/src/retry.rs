//! `retry()`: a plain async function wrapping a fallible operation with
//! the delay/attempt policy a [`crate::error::TaskError::Retryable`]
//! carries (spec §7 "retry is a function, not a generated wrapper" —
//! spec §9 Design Notes rules out code generation here).

use crate::error::TaskError;
use std::future::Future;

/// Retry policy: at most `max_attempts` total tries (including the
/// first), sleeping for the `Retryable` error's own delay hint between
/// attempts, or `default_delay` if the error carries none.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub default_delay: std::time::Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, default_delay: std::time::Duration::from_millis(100) }
    }
}

/// Run `op` up to `policy.max_attempts` times, retrying only on
/// [`TaskError::Retryable`] (every other variant is returned
/// immediately — spec §7 "only Retryable is eligible for retry()").
/// Exhausting the attempt budget surfaces
/// [`TaskError::MaxRetriesExceeded`] carrying the last failure's
/// message.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, TaskError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TaskError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(TaskError::Retryable { message, delay }) => {
                if attempt >= policy.max_attempts {
                    return Err(TaskError::MaxRetriesExceeded(message));
                }
                let sleep_for = if delay.is_zero() { policy.default_delay } else { delay };
                tokio::time::sleep(sleep_for).await;
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result = retry(RetryPolicy::default(), move || {
            let calls3 = calls2.clone();
            async move {
                let n = calls3.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TaskError::Retryable { message: "down".into(), delay: Duration::from_millis(1) })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let policy = RetryPolicy { max_attempts: 2, default_delay: Duration::from_millis(1) };
        let result: Result<(), TaskError> = retry(policy, || async {
            Err(TaskError::Retryable { message: "still down".into(), delay: Duration::from_millis(1) })
        })
        .await;
        assert!(matches!(result, Err(TaskError::MaxRetriesExceeded(_))));
    }

    #[tokio::test]
    async fn non_retryable_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<(), TaskError> = retry(RetryPolicy::default(), move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            async { Err(TaskError::NotFound("x".into())) }
        })
        .await;
        assert!(matches!(result, Err(TaskError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
