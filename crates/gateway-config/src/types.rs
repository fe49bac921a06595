//! Configuration structures.

use crate::seed::ProviderSeed;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct GatewayConfig {
    /// HTTP listener
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Outbound HTTP client
    #[serde(default)]
    #[validate(nested)]
    pub transport: TransportConfig,

    /// Stream multiplexer
    #[serde(default)]
    #[validate(nested)]
    pub streaming: StreamingConfig,

    /// Logging
    #[serde(default)]
    #[validate(nested)]
    pub logging: LogConfig,

    /// Providers registered at startup
    #[serde(default)]
    #[validate(nested)]
    pub providers: Vec<ProviderSeed>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    #[validate(length(min = 1))]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// How long in-flight requests get to finish on shutdown
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    /// `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransportConfig {
    /// Whole-request timeout for buffered calls
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub request_timeout: Duration,

    /// TCP connect timeout for both modes
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub connect_timeout: Duration,

    /// Whole-session timeout for streaming calls; unbounded when absent
    #[serde(default, with = "humantime_serde")]
    pub stream_timeout: Option<Duration>,

    /// Cap on draining an error body when a stream fails to open
    #[serde(default = "default_error_drain_timeout", with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub error_drain_timeout: Duration,

    /// Idle connections kept per upstream host
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    /// How long an idle connection is kept
    #[serde(default = "default_pool_idle_timeout", with = "humantime_serde")]
    pub pool_idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            stream_timeout: None,
            error_drain_timeout: default_error_drain_timeout(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            pool_idle_timeout: default_pool_idle_timeout(),
        }
    }
}

/// Stream multiplexer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StreamingConfig {
    /// Output channel capacity per stream
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1, max = 10000))]
    pub channel_capacity: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LogConfig {
    /// Default level directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    #[validate(length(min = 1))]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn non_zero_duration(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::new("zero_duration"));
    }
    Ok(())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

const fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_error_drain_timeout() -> Duration {
    Duration::from_secs(5)
}

const fn default_pool_max_idle_per_host() -> usize {
    32
}

const fn default_pool_idle_timeout() -> Duration {
    Duration::from_secs(90)
}

const fn default_channel_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}
