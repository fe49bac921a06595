//! # Gateway Config
//!
//! Layered configuration for the provider gateway: a YAML, TOML or JSON file,
//! `GATEWAY_*` environment overrides, and `validator` checks on the result.
//! Providers listed in the file are seeds registered at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod loader;
mod seed;
mod types;

pub use error::ConfigError;
pub use loader::{finalize, load_config, load_config_from, parse_config, CONFIG_PATH_ENV};
pub use seed::{AuthSeed, ProviderSeed};
pub use types::{GatewayConfig, LogConfig, LogFormat, ServerConfig, StreamingConfig, TransportConfig};
