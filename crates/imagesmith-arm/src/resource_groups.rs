//! `Microsoft.Resources/resourceGroups`

use async_trait::async_trait;
use imagesmith_core::client::ResourceGroupClient;
use imagesmith_core::operation::Operation;
use imagesmith_core::resource::{ResourceGroup, ResourceGroupSpec};
use imagesmith_core::Result;

use crate::client::ArmClient;

pub const API_VERSION: &str = "2021-04-01";

impl ArmClient {
    fn resource_group_path(&self, name: &str) -> String {
        self.subscription_path(&format!("/resourcegroups/{}", urlencoding::encode(name)))
    }
}

#[async_trait]
impl ResourceGroupClient for ArmClient {
    async fn get(&self, name: &str) -> Result<ResourceGroup> {
        self.get_json(
            &self.resource_group_path(name),
            API_VERSION,
            &format!("resource group {name}"),
        )
        .await
    }

    async fn create_or_update(
        &self,
        name: &str,
        spec: &ResourceGroupSpec,
    ) -> Result<Operation<ResourceGroup>> {
        self.begin_put(
            &self.resource_group_path(name),
            API_VERSION,
            spec,
            format!("create resource group {name}"),
        )
        .await
    }
}
