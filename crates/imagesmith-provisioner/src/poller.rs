//! Waiting on long-running operations with a caller-chosen deadline.

use imagesmith_core::operation::{Operation, OperationStatus};
use imagesmith_core::{Error, Result};
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until, timeout_at};
use tracing::debug;

/// How long the caller is willing to wait for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Check once; anything but a terminal status is a timeout.
    Immediate,
    /// Keep polling until the duration elapses.
    Within(Duration),
    /// Wait for as long as the remote operation runs.
    Unbounded,
}

impl Deadline {
    fn limit(self) -> Duration {
        match self {
            Deadline::Immediate | Deadline::Unbounded => Duration::ZERO,
            Deadline::Within(limit) => limit,
        }
    }
}

/// Poll `operation` until it reaches a terminal state or `deadline` passes.
///
/// A remote-reported failure is returned unchanged. Running out of time yields
/// [`Error::PollingTimeout`], including when a single status check is still
/// outstanding at the deadline.
pub async fn wait_for_completion<T: Send>(
    mut operation: Operation<T>,
    deadline: Deadline,
) -> Result<T> {
    let expires_at = match deadline {
        Deadline::Within(limit) => Some(Instant::now() + limit),
        Deadline::Immediate | Deadline::Unbounded => None,
    };
    let timed_out = |operation: &Operation<T>| Error::PollingTimeout {
        operation: operation.description().to_string(),
        timeout: deadline.limit(),
    };

    loop {
        let status = match expires_at {
            Some(at) => match timeout_at(at, operation.poll()).await {
                Ok(status) => status?,
                Err(_) => return Err(timed_out(&operation)),
            },
            None => operation.poll().await?,
        };

        match status {
            OperationStatus::Succeeded(value) => return Ok(value),
            OperationStatus::Failed(err) => return Err(err),
            OperationStatus::InProgress => {
                debug!(operation = %operation.description(), "Operation still in progress");
            }
        }

        let interval = operation.poll_interval();
        match (deadline, expires_at) {
            (Deadline::Immediate, _) => return Err(timed_out(&operation)),
            (_, Some(at)) => {
                if Instant::now() >= at {
                    return Err(timed_out(&operation));
                }
                sleep_until((Instant::now() + interval).min(at)).await;
            }
            (_, None) => sleep(interval).await,
        }
    }
}
