//! Mapping ARM responses onto the core error taxonomy.

use imagesmith_core::Error;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorDetail {
    pub(crate) fn from_body(body: &Value) -> Option<Self> {
        serde_json::from_value::<ErrorEnvelope>(body.clone())
            .map(|envelope| envelope.error)
            .ok()
    }

    pub(crate) fn into_error(self, status: u16) -> Error {
        Error::RemoteRejected {
            status,
            code: self.code,
            message: self.message.unwrap_or_else(|| "no message".to_string()),
        }
    }
}

/// Classify a non-success response.
///
/// `404` is the only status that becomes [`Error::NotFound`]; everything else
/// (auth, validation, conflict, throttling) is `RemoteRejected`.
pub(crate) fn classify(status: StatusCode, body: &Value, what: &str) -> Error {
    let detail = ErrorDetail::from_body(body);

    if status == StatusCode::NOT_FOUND {
        let reason = detail
            .and_then(|d| d.message.or(d.code))
            .unwrap_or_else(|| "resource does not exist".to_string());
        return Error::NotFound(format!("{what}: {reason}"));
    }

    match detail {
        Some(detail) => detail.into_error(status.as_u16()),
        None => {
            let message = match body {
                Value::Null => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            Error::RemoteRejected {
                status: status.as_u16(),
                code: None,
                message: format!("{what}: {message}"),
            }
        }
    }
}

pub(crate) fn transport(err: reqwest::Error) -> Error {
    Error::Transport(err.to_string())
}
