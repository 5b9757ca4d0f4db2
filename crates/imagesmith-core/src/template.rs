//! Image-builder template model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ResourceId;

/// An image-builder template: where the build starts from, what it runs, and
/// where the result is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTemplate {
    /// Set by the remote system; absent on templates built locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
    pub identity: ImageTemplateIdentity,
    pub properties: ImageTemplateProperties,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTemplateIdentity {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(default)]
    pub user_assigned_identities: BTreeMap<String, UserAssignedIdentityRef>,
}

impl ImageTemplateIdentity {
    /// An identity block granting the build a single user-assigned identity.
    pub fn user_assigned(identity_id: &ResourceId) -> Self {
        let mut identities = BTreeMap::new();
        identities.insert(
            identity_id.to_string(),
            UserAssignedIdentityRef::default(),
        );
        Self {
            identity_type: "UserAssigned".to_string(),
            user_assigned_identities: identities,
        }
    }
}

/// Entry in the identity map. Empty on requests; populated by the remote side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignedIdentityRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTemplateProperties {
    pub source: ImageTemplateSource,
    #[serde(default)]
    pub customize: Vec<Customizer>,
    pub distribute: Vec<Distributor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_timeout_in_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_profile: Option<VmProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_disk_size_gb: Option<u32>,
}

/// Image the build starts from.
///
/// Source kinds this crate never writes (managed images, gallery versions)
/// are kept verbatim in `Other` so existing templates still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ImageTemplateSource {
    PlatformImage(PlatformImageSource),
    #[serde(untagged)]
    Other(Value),
}

/// A marketplace image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformImageSource {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_info: Option<PlatformImagePurchasePlan>,
}

/// Marketplace purchase plan attached to a platform image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformImagePurchasePlan {
    pub plan_name: String,
    pub plan_product: String,
    pub plan_publisher: String,
}

/// One customization step, selected by its `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Customizer {
    Shell(ShellCustomizer),
    File(FileCustomizer),
    PowerShell(PowerShellCustomizer),
    /// A step read back from a remote template, e.g. `WindowsRestart`.
    #[serde(untagged)]
    Other(Value),
}

impl Customizer {
    /// The discriminator value this step serializes with.
    pub fn kind(&self) -> &str {
        match self {
            Customizer::Shell(_) => "Shell",
            Customizer::File(_) => "File",
            Customizer::PowerShell(_) => "PowerShell",
            Customizer::Other(value) => type_of(value),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Customizer::Shell(c) => c.name.as_deref(),
            Customizer::File(c) => c.name.as_deref(),
            Customizer::PowerShell(c) => c.name.as_deref(),
            Customizer::Other(value) => value.get("name").and_then(Value::as_str),
        }
    }
}

fn type_of(value: &Value) -> &str {
    value.get("type").and_then(Value::as_str).unwrap_or_default()
}

/// Runs shell commands, either inline or from a script URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellCustomizer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline: Vec<String>,
}

/// Copies a file from a URI into the build VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCustomizer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_checksum: Option<String>,
}

/// Runs PowerShell commands on Windows builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerShellCustomizer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_elevated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_system: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub valid_exit_codes: Vec<i32>,
}

/// Where a finished image is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Distributor {
    SharedImage(SharedImageDistributor),
    /// Managed-image or VHD outputs of a template created elsewhere.
    #[serde(untagged)]
    Other(Value),
}

impl Distributor {
    pub fn kind(&self) -> &str {
        match self {
            Distributor::SharedImage(_) => "SharedImage",
            Distributor::Other(value) => type_of(value),
        }
    }
}

/// Publishes the image as a version of a gallery image definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedImageDistributor {
    pub gallery_image_id: ResourceId,
    pub run_output_name: String,
    #[serde(default)]
    pub target_regions: Vec<TargetRegion>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub artifact_tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRegion {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_type: Option<String>,
}

impl TargetRegion {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replica_count: None,
            storage_account_type: None,
        }
    }
}
