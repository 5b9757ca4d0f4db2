//! Role permission document.

use std::path::Path;

use imagesmith_core::resource::Permission;
use tracing::debug;

use crate::ConfigResult;
use crate::document::read_json;

/// Load the permission set granted by the image builder role.
///
/// The document is a single ARM `Permission` object:
/// `{"actions": [...], "notActions": [...], "dataActions": [...], "notDataActions": [...]}`.
pub fn load_role_permissions(path: &Path) -> ConfigResult<Permission> {
    let permission: Permission = read_json(path)?;
    debug!(
        path = %path.display(),
        actions = permission.actions.len(),
        "Loaded role permissions"
    );
    Ok(permission)
}
