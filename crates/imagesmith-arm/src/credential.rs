//! Bearer-token credentials for the management API.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use imagesmith_core::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::error::transport;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Tokens are refreshed this many seconds before they expire.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// A bearer token and when it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - TimeDelta::seconds(EXPIRY_MARGIN_SECS) > now
    }
}

/// Supplies tokens for a scope such as `https://management.azure.com/.default`.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn token(&self, scope: &str) -> Result<AccessToken>;
}

/// Service-principal credential using the client-credentials grant.
///
/// Reads `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET` and the
/// optional `AZURE_AUTHORITY_HOST`.
pub struct EnvironmentCredential {
    http: reqwest::Client,
    authority_host: Url,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    cache: Mutex<Option<(String, AccessToken)>>,
}

impl EnvironmentCredential {
    pub fn new(
        authority_host: Url,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            authority_host,
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn from_env() -> Result<Self> {
        let tenant_id = required_env("AZURE_TENANT_ID")?;
        let client_id = required_env("AZURE_CLIENT_ID")?;
        let client_secret = required_env("AZURE_CLIENT_SECRET")?;
        let authority = std::env::var("AZURE_AUTHORITY_HOST")
            .unwrap_or_else(|_| DEFAULT_AUTHORITY_HOST.to_string());
        let authority_host = Url::parse(&authority)
            .map_err(|e| Error::Credential(format!("invalid AZURE_AUTHORITY_HOST: {e}")))?;

        Ok(Self::new(authority_host, tenant_id, client_id, client_secret))
    }

    fn token_url(&self) -> Result<Url> {
        self.authority_host
            .join(&format!(
                "{}/oauth2/v2.0/token",
                urlencoding::encode(&self.tenant_id)
            ))
            .map_err(|e| Error::Credential(format!("invalid token endpoint: {e}")))
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        let response = self
            .http
            .post(self.token_url()?)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Credential(format!(
                "token request failed ({}): {}",
                status, text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Credential(format!("invalid token response: {e}")))?;

        Ok(AccessToken {
            secret: token.access_token,
            expires_at: Utc::now() + TimeDelta::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    async fn token(&self, scope: &str) -> Result<AccessToken> {
        let mut cache = self.cache.lock().await;
        if let Some((cached_scope, token)) = cache.as_ref() {
            if cached_scope == scope && token.is_fresh(Utc::now()) {
                return Ok(token.clone());
            }
        }

        debug!(scope, "Requesting access token");
        let token = self.request_token(scope).await?;
        *cache = Some((scope.to_string(), token.clone()));
        Ok(token)
    }
}

/// A pre-issued token, e.g. from `az account get-access-token`.
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn token(&self, _scope: &str) -> Result<AccessToken> {
        Ok(AccessToken {
            secret: self.token.clone(),
            expires_at: Utc::now() + TimeDelta::days(1),
        })
    }
}

/// Pick a credential from the environment.
///
/// A service principal (`AZURE_CLIENT_SECRET` and friends) wins; otherwise
/// `AZURE_ACCESS_TOKEN` is used as-is.
pub fn credential_from_env() -> Result<Arc<dyn TokenCredential>> {
    if std::env::var_os("AZURE_CLIENT_SECRET").is_some() {
        return Ok(Arc::new(EnvironmentCredential::from_env()?));
    }
    if let Ok(token) = std::env::var("AZURE_ACCESS_TOKEN") {
        return Ok(Arc::new(StaticTokenCredential::new(token)));
    }
    Err(Error::Credential(
        "set AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET, or AZURE_ACCESS_TOKEN"
            .to_string(),
    ))
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| Error::Credential(format!("{name} is not set")))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}
