//! Customization steps document.
//!
//! The document is a JSON array. Each element carries a `type` discriminator
//! that selects the shape it is decoded into; unknown types are rejected so a
//! typo never silently drops a build step.

use std::path::Path;

use imagesmith_core::template::Customizer;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::document::read_json;
use crate::{ConfigError, ConfigResult};

/// Load the ordered list of customization steps.
pub fn load_customizations(path: &Path) -> ConfigResult<Vec<Customizer>> {
    let items: Vec<Value> = read_json(path)?;
    let steps = decode_customizations(items)?;
    debug!(path = %path.display(), steps = steps.len(), "Loaded customizations");
    Ok(steps)
}

/// Decode raw steps in order, dispatching on each one's `type`.
pub fn decode_customizations(items: Vec<Value>) -> ConfigResult<Vec<Customizer>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| decode_customizer(index, item))
        .collect()
}

fn decode_customizer(index: usize, item: Value) -> ConfigResult<Customizer> {
    let kind = item
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ConfigError::MissingDiscriminator { index })?
        .to_string();

    match kind.as_str() {
        "Shell" => decode_as(index, &kind, item).map(Customizer::Shell),
        "File" => decode_as(index, &kind, item).map(Customizer::File),
        "PowerShell" => decode_as(index, &kind, item).map(Customizer::PowerShell),
        _ => Err(ConfigError::UnknownCustomizer { index, kind }),
    }
}

fn decode_as<T: DeserializeOwned>(index: usize, kind: &str, mut item: Value) -> ConfigResult<T> {
    if let Some(object) = item.as_object_mut() {
        object.remove("type");
    }
    serde_json::from_value(item).map_err(|source| ConfigError::InvalidCustomizer {
        index,
        kind: kind.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_decodes_steps_in_order() {
        let steps = decode_customizations(vec![
            json!({"type": "Shell", "name": "update", "inline": ["sudo apt-get update -y"]}),
            json!({"type": "File", "name": "motd", "sourceUri": "https://example.com/motd", "destination": "/etc/motd"}),
            json!({"type": "Shell", "name": "script", "scriptUri": "https://example.com/setup.sh", "sha256Checksum": "abc"}),
        ])
        .unwrap();

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].name(), Some("update"));
        match &steps[1] {
            Customizer::File(file) => {
                assert_eq!(file.destination.as_deref(), Some("/etc/motd"));
            }
            other => panic!("Expected File, got {:?}", other),
        }
        match &steps[2] {
            Customizer::Shell(shell) => {
                assert_eq!(shell.script_uri.as_deref(), Some("https://example.com/setup.sh"));
                assert!(shell.inline.is_empty());
            }
            other => panic!("Expected Shell, got {:?}", other),
        }
    }

    #[test]
    fn test_decodes_powershell() {
        let steps = decode_customizations(vec![json!({
            "type": "PowerShell",
            "inline": ["Install-WindowsFeature Web-Server"],
            "runElevated": true,
            "validExitCodes": [0, 3010]
        })])
        .unwrap();
        match &steps[0] {
            Customizer::PowerShell(ps) => {
                assert_eq!(ps.run_elevated, Some(true));
                assert_eq!(ps.valid_exit_codes, vec![0, 3010]);
            }
            other => panic!("Expected PowerShell, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = decode_customizations(vec![
            json!({"type": "Shell", "inline": ["true"]}),
            json!({"type": "WindowsRestart", "restartTimeout": "5m"}),
        ])
        .unwrap_err();
        match err {
            ConfigError::UnknownCustomizer { index, kind } => {
                assert_eq!(index, 1);
                assert_eq!(kind, "WindowsRestart");
            }
            other => panic!("Expected UnknownCustomizer, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_type_is_rejected() {
        let err = decode_customizations(vec![json!({"inline": ["true"]})]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDiscriminator { index: 0 }));

        let err = decode_customizations(vec![json!({"type": 3})]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDiscriminator { index: 0 }));
    }

    #[test]
    fn test_malformed_step_names_its_kind() {
        let err = decode_customizations(vec![json!({"type": "Shell", "inline": "not-a-list"})])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCustomizer { index: 0, ref kind, .. } if kind == "Shell"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"type": "Shell", "inline": ["echo hi"]}}]"#).unwrap();
        let steps = load_customizations(file.path()).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].kind(), "Shell");
    }

    #[test]
    fn test_top_level_must_be_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"type": "Shell"}}"#).unwrap();
        let err = load_customizations(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
