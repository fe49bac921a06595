//! # Provider Gateway
//!
//! One canonical chat API in front of any number of third-party providers,
//! each described by data: a base URL, auth, models, endpoints and a pair of
//! request/response templates.
//!
//! ## Usage
//!
//! ```bash
//! # Start with default configuration
//! provider-gateway
//!
//! # Start with a config file that seeds providers
//! provider-gateway --config /path/to/gateway.yaml
//!
//! # Start with environment overrides
//! GATEWAY_PORT=9000 provider-gateway
//! ```

use anyhow::Context;
use clap::Parser;
use gateway_config::{load_config, load_config_from, GatewayConfig, LogFormat, CONFIG_PATH_ENV};
use gateway_core::ProviderAdmin;
use gateway_providers::HttpTransportConfig;
use gateway_server::{AppState, Server};
use gateway_telemetry::{init_logging, LoggingConfig};
use std::path::PathBuf;
use tracing::{error, info};

/// Template-driven gateway for chat completion providers
#[derive(Debug, Parser)]
#[command(name = "provider-gateway", version, about)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

/// Application entry point
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match read_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(2);
        }
    };

    let logging = LoggingConfig::default()
        .with_level(&config.logging.level)
        .with_json(matches!(config.logging.format, LogFormat::Json));
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting provider gateway"
    );

    if let Err(e) = run(config).await {
        error!(error = format!("{e:#}"), "Gateway failed");
        std::process::exit(1);
    }
}

async fn read_config(cli: &Cli) -> anyhow::Result<GatewayConfig> {
    match &cli.config {
        Some(path) => load_config_from(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => load_config().await.context("loading defaults"),
    }
}

/// Main application logic
async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        providers = config.providers.len(),
        "Configuration loaded"
    );

    let transport = HttpTransportConfig::default()
        .with_request_timeout(config.transport.request_timeout)
        .with_connect_timeout(config.transport.connect_timeout)
        .with_stream_timeout(config.transport.stream_timeout)
        .with_error_drain_timeout(config.transport.error_drain_timeout)
        .with_pool(
            config.transport.pool_max_idle_per_host,
            config.transport.pool_idle_timeout,
        );

    let state = AppState::builder()
        .transport_config(transport)
        .channel_capacity(config.streaming.channel_capacity)
        .build()
        .context("building gateway state")?;

    seed_providers(&state.admin, &config).await?;

    Server::new(config.server.clone(), state)
        .run()
        .await
        .context("serving")?;

    info!("Shutdown complete");
    Ok(())
}

/// Register every provider listed in the configuration
async fn seed_providers(admin: &ProviderAdmin, config: &GatewayConfig) -> anyhow::Result<()> {
    for seed in &config.providers {
        let input = seed
            .to_new_provider()
            .with_context(|| format!("provider '{}'", seed.name))?;
        let provider = admin
            .create_provider(input)
            .await
            .with_context(|| format!("registering provider '{}'", seed.name))?;
        let id = provider.id();

        if !seed.models.is_empty() {
            admin
                .add_models(id, seed.models.clone())
                .await
                .with_context(|| format!("models of provider '{}'", seed.name))?;
        }
        if !seed.endpoints.is_empty() {
            admin
                .add_endpoints(id, seed.endpoints.clone())
                .await
                .with_context(|| format!("endpoints of provider '{}'", seed.name))?;
        }
        if !seed.active {
            admin.deactivate_provider(id).await?;
        }

        info!(
            provider_id = %id,
            name = %seed.name,
            models = seed.models.len(),
            endpoints = seed.endpoints.len(),
            active = seed.active,
            "Seeded provider"
        );
    }
    Ok(())
}
