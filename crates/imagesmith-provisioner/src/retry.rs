//! Retrying a create until the remote side's view catches up.

use imagesmith_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::warn;

/// Fixed-interval retry bounded by an overall deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5 * 60),
            interval: Duration::from_secs(15),
        }
    }
}

/// Run `attempt` until it succeeds or the policy's deadline has passed.
///
/// Every failure is retried, whatever its kind. The first failure observed
/// after the deadline is returned wrapped in [`Error::RetryTimeout`].
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, operation: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let deadline = Instant::now() + policy.timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if Instant::now() > deadline {
            return Err(Error::RetryTimeout {
                operation: operation.to_string(),
                timeout: policy.timeout,
                source: Box::new(err),
            });
        }

        warn!(
            operation,
            attempt = attempts,
            error = %err,
            retry_in = ?policy.interval,
            "Attempt failed, retrying"
        );
        sleep(policy.interval).await;
    }
}
