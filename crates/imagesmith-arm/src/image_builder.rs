//! `Microsoft.VirtualMachineImages/imageTemplates`

use async_trait::async_trait;
use imagesmith_core::client::ImageTemplateClient;
use imagesmith_core::operation::Operation;
use imagesmith_core::template::ImageTemplate;
use imagesmith_core::Result;

use crate::client::ArmClient;

pub const API_VERSION: &str = "2022-07-01";

impl ArmClient {
    fn image_template_path(&self, resource_group: &str, name: &str) -> String {
        self.provider_path(
            resource_group,
            &format!(
                "Microsoft.VirtualMachineImages/imageTemplates/{}",
                urlencoding::encode(name)
            ),
        )
    }
}

#[async_trait]
impl ImageTemplateClient for ArmClient {
    async fn get(&self, resource_group: &str, name: &str) -> Result<ImageTemplate> {
        self.get_json(
            &self.image_template_path(resource_group, name),
            API_VERSION,
            &format!("image template {name}"),
        )
        .await
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        template: &ImageTemplate,
    ) -> Result<Operation<ImageTemplate>> {
        self.begin_put(
            &self.image_template_path(resource_group, name),
            API_VERSION,
            template,
            format!("create image template {name}"),
        )
        .await
    }

    async fn run(&self, resource_group: &str, name: &str) -> Result<Operation<()>> {
        self.begin_action(
            &format!("{}/run", self.image_template_path(resource_group, name)),
            API_VERSION,
            format!("run image template {name}"),
        )
        .await
    }
}
