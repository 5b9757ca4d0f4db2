//! CLI command implementations.

pub mod provision;
pub mod run;

use anyhow::{Context, Result};
use clap::Args;
use imagesmith_arm::{ArmClient, DEFAULT_ENDPOINT, credential_from_env};
use url::Url;

/// Which subscription to act on, and where its management API lives.
#[derive(Args, Debug)]
pub struct AzureArgs {
    /// Azure subscription ID
    #[arg(long, short = 's', env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription_id: String,

    /// Resource Manager endpoint
    #[arg(long, env = "AZURE_RESOURCE_MANAGER_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub management_endpoint: Url,
}

impl AzureArgs {
    /// Build a management client with credentials from the environment.
    pub fn client(&self) -> Result<ArmClient> {
        let credential = credential_from_env().context("Failed to set up credentials")?;
        Ok(ArmClient::with_endpoint(
            self.management_endpoint.clone(),
            self.subscription_id.clone(),
            credential,
        ))
    }
}
