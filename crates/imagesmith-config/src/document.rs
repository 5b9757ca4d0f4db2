//! Reading JSON documents from disk.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::{ConfigError, ConfigResult};

/// Read `path` and decode it as `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json(path, &content)
}

/// Decode `content`, attributing errors to `path`.
pub fn parse_json<T: DeserializeOwned>(path: &Path, content: &str) -> ConfigResult<T> {
    serde_json::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        match err {
            ConfigError::Io { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("Expected Io, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"actions\": [").unwrap();
        let err = read_json::<serde_json::Value>(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("failed to parse"));
    }
}
