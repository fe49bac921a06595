//! Configuration loading: file, then environment overrides, then validation.

use crate::error::ConfigError;
use crate::types::{GatewayConfig, LogFormat};
use std::path::Path;
use tracing::{debug, info};
use validator::Validate;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

const HOST_ENV: &str = "GATEWAY_HOST";
const PORT_ENV: &str = "GATEWAY_PORT";
const LOG_LEVEL_ENV: &str = "GATEWAY_LOG_LEVEL";
const LOG_FORMAT_ENV: &str = "GATEWAY_LOG_FORMAT";

/// Load configuration from `GATEWAY_CONFIG`, or defaults when it is unset
pub async fn load_config() -> Result<GatewayConfig, ConfigError> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => load_config_from(path).await,
        _ => {
            debug!("No config file given, using defaults");
            finalize(GatewayConfig::default(), env_lookup)
        }
    }
}

/// Load configuration from a YAML, TOML or JSON file
pub async fn load_config_from(path: impl AsRef<Path>) -> Result<GatewayConfig, ConfigError> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let config = parse_config(&contents, &extension)?;
    info!(path = %path.display(), "Loaded configuration file");

    finalize(config, env_lookup)
}

/// Parse configuration text in the format named by `extension`
pub fn parse_config(contents: &str, extension: &str) -> Result<GatewayConfig, ConfigError> {
    match extension {
        "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "yaml",
            message: e.to_string(),
        }),
        "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "toml",
            message: e.to_string(),
        }),
        "json" => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "json",
            message: e.to_string(),
        }),
        other => Err(ConfigError::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

/// Apply overrides, resolve provider credentials and validate
pub fn finalize(
    mut config: GatewayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<GatewayConfig, ConfigError> {
    apply_overrides(&mut config, &lookup)?;
    for seed in &mut config.providers {
        seed.resolve_credential(&lookup)?;
    }
    config.validate()?;
    Ok(config)
}

fn apply_overrides(
    config: &mut GatewayConfig,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(host) = lookup(HOST_ENV) {
        config.server.host = host;
    }
    if let Some(port) = lookup(PORT_ENV) {
        config.server.port = port.parse().map_err(|e| ConfigError::InvalidOverride {
            variable: PORT_ENV,
            message: format!("{e}"),
        })?;
    }
    if let Some(level) = lookup(LOG_LEVEL_ENV) {
        config.logging.level = level;
    }
    if let Some(format) = lookup(LOG_FORMAT_ENV) {
        config.logging.format = format
            .parse::<LogFormat>()
            .map_err(|message| ConfigError::InvalidOverride {
                variable: LOG_FORMAT_ENV,
                message,
            })?;
    }
    Ok(())
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
