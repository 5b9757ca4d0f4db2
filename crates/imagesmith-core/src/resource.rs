//! Resource models for the management API surfaces imagesmith provisions.
//!
//! Field names follow the ARM JSON representation so the same types serve as
//! request bodies, response bodies, and configuration documents.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ResourceId;

/// The kinds of resources the provisioning pipeline ensures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    ResourceGroup,
    UserAssignedIdentity,
    RoleDefinition,
    RoleAssignment,
    Gallery,
    GalleryImage,
    ImageTemplate,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::ResourceGroup => "resource group",
            ResourceKind::UserAssignedIdentity => "user-assigned identity",
            ResourceKind::RoleDefinition => "role definition",
            ResourceKind::RoleAssignment => "role assignment",
            ResourceKind::Gallery => "image gallery",
            ResourceKind::GalleryImage => "image definition",
            ResourceKind::ImageTemplate => "image template",
        };
        f.write_str(name)
    }
}

/// A resource group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub id: ResourceId,
    pub name: String,
    pub location: String,
}

/// Desired state of a resource group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroupSpec {
    pub location: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// A user-assigned managed identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAssignedIdentity {
    pub id: ResourceId,
    pub name: String,
    pub location: String,
    pub properties: IdentityProperties,
}

impl UserAssignedIdentity {
    /// The service principal the identity authenticates as.
    pub fn principal_id(&self) -> &str {
        &self.properties.principal_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProperties {
    pub principal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// Desired state of a user-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySpec {
    pub location: String,
}

/// A set of allowed and denied operations granted by a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_data_actions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefinitionProperties {
    #[serde(default)]
    pub role_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub role_type: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub assignable_scopes: Vec<String>,
}

/// A role definition. Its `name` is a GUID; the human-facing name is
/// `properties.role_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub properties: RoleDefinitionProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDefinitionSpec {
    pub properties: RoleDefinitionProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentProperties {
    #[serde(default)]
    pub role_definition_id: String,
    #[serde(default)]
    pub principal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A binding of a principal to a role at some scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub properties: RoleAssignmentProperties,
}

impl RoleAssignment {
    /// Whether this assignment binds exactly `principal_id` to `role_definition_id`.
    pub fn binds(&self, principal_id: &str, role_definition_id: &str) -> bool {
        self.properties.principal_id == principal_id
            && self.properties.role_definition_id == role_definition_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignmentSpec {
    pub properties: RoleAssignmentProperties,
}

/// A compute image gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    pub id: ResourceId,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GallerySpec {
    pub location: String,
}

/// Publisher/offer/SKU triple naming an image definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImageIdentifier {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
}

/// Properties of an image definition.
///
/// Only the fields imagesmith reads are typed; everything else in the document
/// is carried through to the remote API untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImageProperties {
    pub os_type: String,
    pub os_state: String,
    pub identifier: GalleryImageIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyper_v_generation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

/// An image definition inside a gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: ResourceId,
    pub name: String,
    pub location: String,
    pub properties: GalleryImageProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImageSpec {
    pub location: String,
    pub properties: GalleryImageProperties,
}
