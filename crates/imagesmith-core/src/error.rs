//! Error types for imagesmith.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The remote system has no resource matching the probe.
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote system declined the request for any reason other than absence.
    #[error("remote rejected request ({status}{}): {message}", code_suffix(.code))]
    RemoteRejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A long-running operation was still running when the caller's deadline passed.
    #[error("timed out after {timeout:?} waiting for {operation}")]
    PollingTimeout { operation: String, timeout: Duration },

    /// Every attempt failed until the retry deadline passed.
    #[error("gave up on {operation} after {timeout:?}: {source}")]
    RetryTimeout {
        operation: String,
        timeout: Duration,
        #[source]
        source: Box<Error>,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a `RemoteRejected` from a status and message without an error code.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Whether this error means the probed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Whether this error came from a local deadline rather than the remote side.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::PollingTimeout { .. } | Error::RetryTimeout { .. }
        )
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" {c}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
