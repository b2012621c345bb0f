//! Errors raised outside the request path: startup, configuration and CLI.

use carelink_core::CareError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a CLI command or server startup.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CareError),

    #[error("Cannot read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    ConfigValue { key: String, value: String },

    #[error("{0}")]
    Io(String),
}
