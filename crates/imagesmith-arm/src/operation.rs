//! Following ARM asynchronous operations to completion.

use async_trait::async_trait;
use imagesmith_core::operation::{DEFAULT_POLL_INTERVAL, LongRunningOperation, OperationStatus};
use imagesmith_core::{Error, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::client::{ArmClient, RawResponse};
use crate::error::ErrorDetail;

/// Where the operation's progress is reported.
#[derive(Debug, Clone)]
pub(crate) enum Monitor {
    /// `Azure-AsyncOperation` status resource: `{"status": "...", "error": {...}}`.
    AsyncOperation(Url),
    /// `Location` URL: `202` while running, anything else successful when done.
    Location(Url),
    /// The resource itself, via `properties.provisioningState`.
    ProvisioningState(Url),
}

/// What the operation yields once the monitor reports success.
#[derive(Debug, Clone)]
pub(crate) enum FinalState {
    ResourceAt(Url),
    Nothing,
}

/// A normalized ARM provisioning state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProvisioningState {
    Succeeded,
    Failed(String),
    Running(String),
}

impl ProvisioningState {
    pub(crate) fn parse(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" | "canceled" | "cancelled" => Self::Failed(state.to_string()),
            _ => Self::Running(state.to_string()),
        }
    }

    /// Read `properties.provisioningState` from a resource body, if present.
    pub(crate) fn of(body: &Value) -> Option<Self> {
        body.pointer("/properties/provisioningState")
            .and_then(Value::as_str)
            .map(Self::parse)
    }

    pub(crate) fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running(_))
    }
}

impl Monitor {
    fn url(&self) -> &Url {
        match self {
            Monitor::AsyncOperation(url) | Monitor::Location(url) | Monitor::ProvisioningState(url) => {
                url
            }
        }
    }
}

/// Outcome of one monitor check.
#[derive(Debug)]
pub(crate) enum Progress {
    Running,
    Done(Value),
    Failed(Error),
}

/// Classify one response from the monitor URL.
///
/// `Err` means the status could not be read at all; a failure the remote side
/// reports is `Progress::Failed`.
pub(crate) fn progress(monitor: &Monitor, response: RawResponse, description: &str) -> Result<Progress> {
    match monitor {
        Monitor::AsyncOperation(_) => {
            let response = response.success(description)?;
            let status = response
                .body
                .get("status")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::InvalidResponse(format!(
                        "{description}: operation status has no status field"
                    ))
                })?
                .to_string();
            debug!(operation = %description, status = %status, "Polled async operation");
            match ProvisioningState::parse(&status) {
                ProvisioningState::Running(_) => Ok(Progress::Running),
                ProvisioningState::Succeeded => Ok(Progress::Done(Value::Null)),
                ProvisioningState::Failed(state) => {
                    let detail = response
                        .body
                        .get("error")
                        .and_then(|e| serde_json::from_value::<ErrorDetail>(e.clone()).ok());
                    Ok(Progress::Failed(failure(
                        description,
                        response.status.as_u16(),
                        detail,
                        &state,
                    )))
                }
            }
        }
        Monitor::Location(_) => {
            if response.status == StatusCode::ACCEPTED {
                return Ok(Progress::Running);
            }
            let response = response.success(description)?;
            Ok(Progress::Done(response.body))
        }
        Monitor::ProvisioningState(_) => {
            let response = response.success(description)?;
            match ProvisioningState::of(&response.body) {
                Some(ProvisioningState::Running(state)) => {
                    debug!(operation = %description, state = %state, "Resource still provisioning");
                    Ok(Progress::Running)
                }
                Some(ProvisioningState::Failed(state)) => {
                    let detail = response
                        .body
                        .pointer("/properties/error")
                        .and_then(|e| serde_json::from_value::<ErrorDetail>(e.clone()).ok());
                    Ok(Progress::Failed(failure(
                        description,
                        response.status.as_u16(),
                        detail,
                        &state,
                    )))
                }
                Some(ProvisioningState::Succeeded) | None => Ok(Progress::Done(response.body)),
            }
        }
    }
}

fn failure(description: &str, status: u16, detail: Option<ErrorDetail>, state: &str) -> Error {
    match detail {
        Some(detail) => detail.into_error(status),
        None => Error::RemoteRejected {
            status,
            code: Some(state.to_string()),
            message: format!("{description} ended in state {state}"),
        },
    }
}

/// Where the final value comes from once the monitor reports success.
#[derive(Debug, PartialEq)]
pub(crate) enum FinalRead<'a> {
    /// Re-read the resource.
    Fetch(&'a Url),
    /// The last monitor body already is the resource.
    MonitorBody,
    Empty,
}

pub(crate) fn final_read<'a>(monitor: &Monitor, final_state: &'a FinalState) -> FinalRead<'a> {
    match (final_state, monitor) {
        (FinalState::Nothing, _) => FinalRead::Empty,
        (FinalState::ResourceAt(_), Monitor::ProvisioningState(_)) => FinalRead::MonitorBody,
        (FinalState::ResourceAt(url), _) => FinalRead::Fetch(url),
    }
}

/// A remote mutation tracked through ARM's async-operation headers.
pub(crate) struct ArmOperation<T> {
    client: ArmClient,
    description: String,
    monitor: Monitor,
    final_state: FinalState,
    interval: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArmOperation<T> {
    pub(crate) fn new(
        client: ArmClient,
        description: String,
        monitor: Monitor,
        final_state: FinalState,
        retry_after: Option<Duration>,
    ) -> Self {
        Self {
            client,
            description,
            monitor,
            final_state,
            interval: retry_after.unwrap_or(DEFAULT_POLL_INTERVAL),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T> LongRunningOperation<T> for ArmOperation<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn description(&self) -> &str {
        &self.description
    }

    async fn poll(&mut self) -> Result<OperationStatus<T>> {
        let response = self
            .client
            .execute(Method::GET, self.monitor.url().clone(), None)
            .await?;
        if let Some(interval) = response.retry_after() {
            self.interval = interval;
        }

        let body = match progress(&self.monitor, response, &self.description)? {
            Progress::Running => return Ok(OperationStatus::InProgress),
            Progress::Failed(failure) => return Ok(OperationStatus::Failed(failure)),
            Progress::Done(body) => body,
        };

        let value = match final_read(&self.monitor, &self.final_state) {
            FinalRead::Fetch(url) => {
                self.client
                    .execute(Method::GET, url.clone(), None)
                    .await?
                    .success(&self.description)?
                    .body
            }
            FinalRead::MonitorBody => body,
            FinalRead::Empty => Value::Null,
        };

        serde_json::from_value(value)
            .map(OperationStatus::Succeeded)
            .map_err(|e| Error::InvalidResponse(format!("{}: {e}", self.description)))
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }
}
