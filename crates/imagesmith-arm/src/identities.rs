//! `Microsoft.ManagedIdentity/userAssignedIdentities`

use async_trait::async_trait;
use imagesmith_core::client::IdentityClient;
use imagesmith_core::operation::Operation;
use imagesmith_core::resource::{IdentitySpec, UserAssignedIdentity};
use imagesmith_core::Result;

use crate::client::ArmClient;

pub const API_VERSION: &str = "2023-01-31";

impl ArmClient {
    fn identity_path(&self, resource_group: &str, name: &str) -> String {
        self.provider_path(
            resource_group,
            &format!(
                "Microsoft.ManagedIdentity/userAssignedIdentities/{}",
                urlencoding::encode(name)
            ),
        )
    }
}

#[async_trait]
impl IdentityClient for ArmClient {
    async fn get(&self, resource_group: &str, name: &str) -> Result<UserAssignedIdentity> {
        self.get_json(
            &self.identity_path(resource_group, name),
            API_VERSION,
            &format!("identity {name}"),
        )
        .await
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        spec: &IdentitySpec,
    ) -> Result<Operation<UserAssignedIdentity>> {
        self.begin_put(
            &self.identity_path(resource_group, name),
            API_VERSION,
            spec,
            format!("create identity {name}"),
        )
        .await
    }
}
