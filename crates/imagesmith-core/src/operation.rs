//! Long-running remote operations.
//!
//! A mutation against the management API may finish asynchronously. The client
//! hands back an [`Operation`] which the caller polls until it reaches a
//! terminal state.

use async_trait::async_trait;
use std::time::Duration;

use crate::{Error, Result};

/// Poll interval used when the remote side gives no hint.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Status of an in-flight operation.
#[derive(Debug)]
pub enum OperationStatus<T> {
    /// Still running on the remote side.
    InProgress,
    /// Finished; carries the final resource state.
    Succeeded(T),
    /// The remote side reported failure.
    Failed(Error),
}

impl<T> OperationStatus<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationStatus::InProgress)
    }
}

/// An in-flight remote mutation.
#[async_trait]
pub trait LongRunningOperation<T: Send>: Send {
    /// What the operation is doing, for logs and timeout errors.
    fn description(&self) -> &str;

    /// Check the remote status once.
    ///
    /// `Err` means the status could not be obtained; a remote-reported failure
    /// is `Ok(OperationStatus::Failed(..))`.
    async fn poll(&mut self) -> Result<OperationStatus<T>>;

    /// How long to wait before the next [`poll`](Self::poll).
    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }
}

/// Boxed operation as returned by the client traits.
pub type Operation<T> = Box<dyn LongRunningOperation<T>>;

/// An operation that finished with the response that started it.
pub struct Completed<T> {
    description: String,
    value: Option<T>,
}

impl<T: Send + 'static> Completed<T> {
    pub fn new(description: impl Into<String>, value: T) -> Self {
        Self {
            description: description.into(),
            value: Some(value),
        }
    }

    pub fn boxed(description: impl Into<String>, value: T) -> Operation<T> {
        Box::new(Self::new(description, value))
    }
}

#[async_trait]
impl<T: Send> LongRunningOperation<T> for Completed<T> {
    fn description(&self) -> &str {
        &self.description
    }

    async fn poll(&mut self) -> Result<OperationStatus<T>> {
        self.value
            .take()
            .map(OperationStatus::Succeeded)
            .ok_or_else(|| {
                Error::Internal(format!("{} polled after completion", self.description))
            })
    }
}
