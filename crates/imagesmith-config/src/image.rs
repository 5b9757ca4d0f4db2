//! Image-definition properties document.

use std::path::Path;

use imagesmith_core::resource::GalleryImageProperties;

use crate::document::read_json;
use crate::{ConfigError, ConfigResult};

/// Load the properties of the image definition to create.
///
/// The identifier triple is also the marketplace source of the build, so all
/// three parts must be present and non-empty.
pub fn load_image_properties(path: &Path) -> ConfigResult<GalleryImageProperties> {
    let properties: GalleryImageProperties = read_json(path)?;
    validate_identifier(&properties)?;
    Ok(properties)
}

fn validate_identifier(properties: &GalleryImageProperties) -> ConfigResult<()> {
    let identifier = &properties.identifier;
    for (field, value) in [
        ("identifier.publisher", &identifier.publisher),
        ("identifier.offer", &identifier.offer),
        ("identifier.sku", &identifier.sku),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(field.to_string()));
        }
    }
    Ok(())
}
