//! Configuration loading errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("customization {index} has no \"type\" field")]
    MissingDiscriminator { index: usize },

    #[error("customization {index} has unsupported type {kind:?}")]
    UnknownCustomizer { index: usize, kind: String },

    #[error("customization {index} ({kind}) is malformed: {source}")]
    InvalidCustomizer {
        index: usize,
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
