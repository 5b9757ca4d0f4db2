//! HTTP plumbing shared by every ARM surface.

use imagesmith_core::client::Page;
use imagesmith_core::operation::{Completed, Operation};
use imagesmith_core::{Error, ResourceId, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::credential::TokenCredential;
use crate::error::{classify, transport};
use crate::operation::{ArmOperation, FinalState, Monitor, ProvisioningState};

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Client for the Azure Resource Manager REST API, scoped to one subscription.
///
/// Implements every capability trait in [`imagesmith_core::client`].
#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: Url,
    subscription_id: String,
    credential: Arc<dyn TokenCredential>,
}

impl ArmClient {
    pub fn with_endpoint(
        endpoint: Url,
        subscription_id: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            subscription_id: subscription_id.into(),
            credential,
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// `/subscriptions/{id}{rest}`
    pub(crate) fn subscription_path(&self, rest: &str) -> String {
        format!(
            "/subscriptions/{}{}",
            urlencoding::encode(&self.subscription_id),
            rest
        )
    }

    /// `/subscriptions/{id}/resourceGroups/{group}/providers/{provider_path}`
    pub(crate) fn provider_path(&self, resource_group: &str, provider_path: &str) -> String {
        self.subscription_path(&format!(
            "/resourceGroups/{}/providers/{}",
            urlencoding::encode(resource_group),
            provider_path
        ))
    }

    /// `{scope}/providers/{provider_path}` for scope-relative resources.
    pub(crate) fn scoped_path(scope: &ResourceId, provider_path: &str) -> String {
        format!(
            "{}/providers/{}",
            scope.as_str().trim_end_matches('/'),
            provider_path
        )
    }

    pub(crate) fn url(&self, path: &str, api_version: &str) -> Result<Url> {
        let mut url = self
            .endpoint
            .join(path)
            .map_err(|e| Error::Internal(format!("invalid request path {path}: {e}")))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    fn token_scope(&self) -> String {
        format!("{}/.default", self.endpoint.as_str().trim_end_matches('/'))
    }

    /// Send a request and return the raw response, whatever its status.
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<RawResponse> {
        let token = self.credential.token(&self.token_scope()).await?;

        debug!(method = %method, url = %url, "Sending ARM request");
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&token.secret)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(transport)?;

        Ok(RawResponse {
            status,
            headers,
            body: parse_body(&text),
        })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        what: &str,
    ) -> Result<T> {
        let url = self.url(path, api_version)?;
        self.execute(Method::GET, url, None)
            .await?
            .success(what)?
            .decode(what)
    }

    /// Fetch one page of a collection. `continuation` is a previous page's
    /// `nextLink`, which already carries its own query string.
    pub(crate) async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        continuation: Option<String>,
        what: &str,
    ) -> Result<Page<T>> {
        let url = match continuation {
            Some(link) => Url::parse(&link)
                .map_err(|e| Error::InvalidResponse(format!("bad nextLink {link}: {e}")))?,
            None => self.url(path, api_version)?,
        };
        self.execute(Method::GET, url, None)
            .await?
            .success(what)?
            .decode(what)
    }

    /// Start a `PUT` and return the operation tracking it.
    pub(crate) async fn begin_put<B, T>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
        description: String,
    ) -> Result<Operation<T>>
    where
        B: Serialize,
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.url(path, api_version)?;
        let body = serde_json::to_value(body)
            .map_err(|e| Error::Internal(format!("failed to encode {description}: {e}")))?;
        let response = self
            .execute(Method::PUT, url.clone(), Some(body))
            .await?
            .success(&description)?;

        match put_started(response, url, &description)? {
            Started::Tracking {
                monitor,
                final_state,
                retry_after,
            } => Ok(Box::new(ArmOperation::new(
                self.clone(),
                description,
                monitor,
                final_state,
                retry_after,
            ))),
            Started::Finished(response) => {
                let value = response.decode(&description)?;
                Ok(Completed::boxed(description, value))
            }
        }
    }

    /// Start a `POST` action (such as running a template) that yields no resource.
    pub(crate) async fn begin_action(
        &self,
        path: &str,
        api_version: &str,
        description: String,
    ) -> Result<Operation<()>> {
        let url = self.url(path, api_version)?;
        let response = self
            .execute(Method::POST, url, None)
            .await?
            .success(&description)?;

        match response.monitor() {
            Some(monitor) => Ok(Box::new(ArmOperation::new(
                self.clone(),
                description,
                monitor,
                FinalState::Nothing,
                response.retry_after(),
            ))),
            None => Ok(Completed::boxed(description, ())),
        }
    }
}

/// How a mutation proceeds after its initial response.
#[derive(Debug)]
pub(crate) enum Started {
    Tracking {
        monitor: Monitor,
        final_state: FinalState,
        retry_after: Option<Duration>,
    },
    /// The response already holds the final resource.
    Finished(RawResponse),
}

/// Decide how to follow a successful `PUT` to `url`.
///
/// Async headers win; otherwise a non-terminal `provisioningState` is polled on
/// the resource itself and a terminal `Failed` is rejected straight away.
pub(crate) fn put_started(response: RawResponse, url: Url, description: &str) -> Result<Started> {
    if let Some(monitor) = response.monitor() {
        return Ok(Started::Tracking {
            monitor,
            final_state: FinalState::ResourceAt(url),
            retry_after: response.retry_after(),
        });
    }

    match ProvisioningState::of(&response.body) {
        Some(state) if !state.is_terminal() => Ok(Started::Tracking {
            monitor: Monitor::ProvisioningState(url.clone()),
            final_state: FinalState::ResourceAt(url),
            retry_after: response.retry_after(),
        }),
        Some(ProvisioningState::Failed(reason)) => Err(Error::RemoteRejected {
            status: response.status.as_u16(),
            code: Some("ProvisioningFailed".to_string()),
            message: format!("{description}: {reason}"),
        }),
        _ => Ok(Started::Finished(response)),
    }
}

/// A response whose body has been read.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RawResponse {
    /// Turn a non-success status into the matching error.
    pub(crate) fn success(self, what: &str) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(classify(self.status, &self.body, what))
        }
    }

    pub(crate) fn decode<T: DeserializeOwned>(self, what: &str) -> Result<T> {
        serde_json::from_value(self.body)
            .map_err(|e| Error::InvalidResponse(format!("{what}: {e}")))
    }

    pub(crate) fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    fn header_url(&self, name: &str) -> Option<Url> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Url::parse(v).ok())
    }

    /// How to follow an asynchronous completion, if the response asked for one.
    pub(crate) fn monitor(&self) -> Option<Monitor> {
        if let Some(url) = self.header_url(AZURE_ASYNC_OPERATION) {
            return Some(Monitor::AsyncOperation(url));
        }
        if self.status == StatusCode::ACCEPTED {
            if let Some(url) = self.header_url(reqwest::header::LOCATION.as_str()) {
                return Some(Monitor::Location(url));
            }
        }
        None
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
