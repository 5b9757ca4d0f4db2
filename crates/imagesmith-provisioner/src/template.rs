//! Building the image template from ensured resources and loaded configuration.

use imagesmith_core::resource::GalleryImageIdentifier;
use imagesmith_core::template::*;
use imagesmith_core::{Error, ResourceId, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub const DEFAULT_RUN_OUTPUT_NAME: &str = "aibDemoOutput";
pub const DEFAULT_SOURCE_VERSION: &str = "latest";
pub const DEFAULT_EXPORT_PATH: &str = "generatedTemplate.json";

/// Caller-chosen template settings that do not come from ensured resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSettings {
    pub location: String,
    pub run_output_name: String,
    pub target_regions: Vec<String>,
    pub source_version: String,
    pub build_timeout_in_minutes: Option<u32>,
    pub vm_size: Option<String>,
}

impl TemplateSettings {
    pub fn new(location: impl Into<String>, target_regions: Vec<String>) -> Self {
        Self {
            location: location.into(),
            run_output_name: DEFAULT_RUN_OUTPUT_NAME.to_string(),
            target_regions,
            source_version: DEFAULT_SOURCE_VERSION.to_string(),
            build_timeout_in_minutes: None,
            vm_size: None,
        }
    }
}

/// Assemble a template that builds from the marketplace image named by
/// `image`, runs `customizations` in order, and publishes into `gallery_image_id`.
pub fn assemble_template(
    identity_id: &ResourceId,
    gallery_image_id: &ResourceId,
    image: &GalleryImageIdentifier,
    customizations: Vec<Customizer>,
    settings: &TemplateSettings,
) -> ImageTemplate {
    let source = ImageTemplateSource::PlatformImage(PlatformImageSource {
        publisher: image.publisher.clone(),
        offer: image.offer.clone(),
        sku: image.sku.clone(),
        version: settings.source_version.clone(),
        plan_info: Some(PlatformImagePurchasePlan {
            plan_name: image.sku.clone(),
            plan_product: image.offer.clone(),
            plan_publisher: image.publisher.clone(),
        }),
    });

    let distributor = Distributor::SharedImage(SharedImageDistributor {
        gallery_image_id: gallery_image_id.clone(),
        run_output_name: settings.run_output_name.clone(),
        target_regions: settings
            .target_regions
            .iter()
            .map(|region| TargetRegion::named(region.as_str()))
            .collect(),
        artifact_tags: BTreeMap::new(),
    });

    let vm_profile = settings.vm_size.as_ref().map(|size| VmProfile {
        vm_size: Some(size.clone()),
        os_disk_size_gb: None,
    });

    ImageTemplate {
        id: None,
        name: None,
        location: settings.location.clone(),
        identity: ImageTemplateIdentity::user_assigned(identity_id),
        properties: ImageTemplateProperties {
            source,
            customize: customizations,
            distribute: vec![distributor],
            build_timeout_in_minutes: settings.build_timeout_in_minutes,
            vm_profile,
        },
        tags: BTreeMap::new(),
    }
}

/// Serialize `template` as 4-space-indented JSON.
pub fn render_template(template: &ImageTemplate) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    template
        .serialize(&mut serializer)
        .map_err(|e| Error::Internal(format!("failed to serialize image template: {e}")))?;
    Ok(out)
}

/// Write the rendered template to `path`, replacing any existing file.
pub fn export_template(template: &ImageTemplate, path: &Path) -> Result<()> {
    let rendered = render_template(template)?;
    std::fs::write(path, rendered).map_err(|e| {
        Error::Configuration(format!("failed to write template to {}: {e}", path.display()))
    })?;
    info!(path = %path.display(), "Exported image template");
    Ok(())
}
