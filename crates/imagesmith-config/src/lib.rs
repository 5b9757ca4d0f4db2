//! JSON configuration documents for imagesmith.
//!
//! This crate handles loading of:
//! - Role permissions granted to the image builder identity
//! - Image-definition properties
//! - Template customization steps

pub mod customizations;
pub mod document;
pub mod error;
pub mod image;
pub mod permissions;

use std::path::PathBuf;

use imagesmith_core::resource::{GalleryImageProperties, Permission};
use imagesmith_core::template::Customizer;

pub use customizations::load_customizations;
pub use error::{ConfigError, ConfigResult};
pub use image::load_image_properties;
pub use permissions::load_role_permissions;

/// Where the three configuration documents live.
#[derive(Debug, Clone)]
pub struct DocumentPaths {
    pub role_permissions: PathBuf,
    pub image_properties: PathBuf,
    pub customizations: PathBuf,
}

impl Default for DocumentPaths {
    fn default() -> Self {
        Self {
            role_permissions: PathBuf::from("./config/aibRolePermissions.json"),
            image_properties: PathBuf::from("./config/imageDefinitionProperties.json"),
            customizations: PathBuf::from("./config/customizations.json"),
        }
    }
}

/// Everything a provisioning run reads from disk, loaded up front.
#[derive(Debug, Clone)]
pub struct ProvisionDocuments {
    pub role_permissions: Permission,
    pub image_properties: GalleryImageProperties,
    pub customizations: Vec<Customizer>,
}

impl ProvisionDocuments {
    /// Load all three documents, failing on the first unreadable or malformed one.
    pub fn load(paths: &DocumentPaths) -> ConfigResult<Self> {
        Ok(Self {
            role_permissions: load_role_permissions(&paths.role_permissions)?,
            image_properties: load_image_properties(&paths.image_properties)?,
            customizations: load_customizations(&paths.customizations)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_all_documents() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DocumentPaths {
            role_permissions: write(dir.path(), "perm.json", r#"{"actions": ["*/read"]}"#),
            image_properties: write(
                dir.path(),
                "image.json",
                r#"{"osType": "Linux", "osState": "Generalized", "identifier": {"publisher": "p", "offer": "o", "sku": "s"}}"#,
            ),
            customizations: write(dir.path(), "custom.json", r#"[{"type": "Shell", "inline": ["true"]}]"#),
        };

        let docs = ProvisionDocuments::load(&paths).unwrap();
        assert_eq!(docs.role_permissions.actions, vec!["*/read"]);
        assert_eq!(docs.image_properties.identifier.offer, "o");
        assert_eq!(docs.customizations.len(), 1);
    }

    #[test]
    fn test_load_fails_on_first_bad_document() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DocumentPaths {
            role_permissions: write(dir.path(), "perm.json", r#"{"actions": ["*/read"]}"#),
            image_properties: dir.path().join("missing.json"),
            customizations: write(dir.path(), "custom.json", "not json"),
        };

        let err = ProvisionDocuments::load(&paths).unwrap_err();
        assert!(matches!(err, ConfigError::Io { ref path, .. } if path.ends_with("missing.json")));
    }
}
