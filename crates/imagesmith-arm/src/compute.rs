//! `Microsoft.Compute` galleries and gallery image definitions.

use async_trait::async_trait;
use imagesmith_core::client::{GalleryClient, GalleryImageClient};
use imagesmith_core::operation::Operation;
use imagesmith_core::resource::{Gallery, GalleryImage, GalleryImageSpec, GallerySpec};
use imagesmith_core::Result;

use crate::client::ArmClient;

pub const API_VERSION: &str = "2022-03-03";

impl ArmClient {
    fn gallery_path(&self, resource_group: &str, gallery: &str) -> String {
        self.provider_path(
            resource_group,
            &format!("Microsoft.Compute/galleries/{}", urlencoding::encode(gallery)),
        )
    }

    fn gallery_image_path(&self, resource_group: &str, gallery: &str, image: &str) -> String {
        format!(
            "{}/images/{}",
            self.gallery_path(resource_group, gallery),
            urlencoding::encode(image)
        )
    }
}

#[async_trait]
impl GalleryClient for ArmClient {
    async fn get(&self, resource_group: &str, name: &str) -> Result<Gallery> {
        self.get_json(
            &self.gallery_path(resource_group, name),
            API_VERSION,
            &format!("gallery {name}"),
        )
        .await
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        spec: &GallerySpec,
    ) -> Result<Operation<Gallery>> {
        self.begin_put(
            &self.gallery_path(resource_group, name),
            API_VERSION,
            spec,
            format!("create gallery {name}"),
        )
        .await
    }
}

#[async_trait]
impl GalleryImageClient for ArmClient {
    async fn get(&self, resource_group: &str, gallery: &str, name: &str) -> Result<GalleryImage> {
        self.get_json(
            &self.gallery_image_path(resource_group, gallery, name),
            API_VERSION,
            &format!("image definition {gallery}/{name}"),
        )
        .await
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        gallery: &str,
        name: &str,
        spec: &GalleryImageSpec,
    ) -> Result<Operation<GalleryImage>> {
        self.begin_put(
            &self.gallery_image_path(resource_group, gallery, name),
            API_VERSION,
            spec,
            format!("create image definition {gallery}/{name}"),
        )
        .await
    }
}
