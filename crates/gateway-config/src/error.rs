//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file has an extension we don't parse
    #[error("Unsupported config format '{extension}' (expected yaml, yml, toml or json)")]
    UnsupportedFormat {
        /// File extension
        extension: String,
    },

    /// Config file failed to parse
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        /// Format name
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// Values are out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// An environment override could not be applied
    #[error("Invalid value for {variable}: {message}")]
    InvalidOverride {
        /// Environment variable
        variable: &'static str,
        /// What was wrong
        message: String,
    },

    /// A provider seed has no usable credential
    #[error("Provider '{provider}' has no credential: {message}")]
    MissingCredential {
        /// Provider name
        provider: String,
        /// What was missing
        message: String,
    },
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
