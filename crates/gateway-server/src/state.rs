//! Shared handler state.

use gateway_core::{InMemoryProviderRepository, ProviderAdmin, ProviderRepository};
use gateway_providers::{
    HttpTransport, HttpTransportConfig, ProviderGateway, UpstreamTransport,
    DEFAULT_CHANNEL_CAPACITY,
};
use gateway_telemetry::GatewayMetrics;
use std::sync::Arc;

use crate::server::ServerError;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Dispatch orchestrator
    pub gateway: Arc<ProviderGateway>,
    /// Provider administration
    pub admin: ProviderAdmin,
    /// Prometheus metrics
    pub metrics: Arc<GatewayMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Start building state
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

/// Builder for [`AppState`]; unset parts get in-process defaults
#[derive(Default)]
pub struct AppStateBuilder {
    repository: Option<Arc<dyn ProviderRepository>>,
    transport: Option<Arc<dyn UpstreamTransport>>,
    transport_config: Option<HttpTransportConfig>,
    metrics: Option<GatewayMetrics>,
    channel_capacity: Option<usize>,
}

impl AppStateBuilder {
    /// Use this repository
    #[must_use]
    pub fn repository(mut self, repository: Arc<dyn ProviderRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Use this transport instead of building an HTTP client
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn UpstreamTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Settings for the default HTTP transport
    #[must_use]
    pub fn transport_config(mut self, config: HttpTransportConfig) -> Self {
        self.transport_config = Some(config);
        self
    }

    /// Use this metrics registry
    #[must_use]
    pub fn metrics(mut self, metrics: GatewayMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Streaming channel capacity
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    /// Assemble the state
    pub fn build(self) -> Result<AppState, ServerError> {
        let repository: Arc<dyn ProviderRepository> = match self.repository {
            Some(repository) => repository,
            None => Arc::new(InMemoryProviderRepository::new()),
        };
        let transport: Arc<dyn UpstreamTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                self.transport_config.unwrap_or_default(),
            )?),
        };
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => GatewayMetrics::new()?,
        };

        let gateway = ProviderGateway::new(Arc::clone(&repository), transport)
            .with_channel_capacity(self.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY));

        Ok(AppState {
            gateway: Arc::new(gateway),
            admin: ProviderAdmin::new(repository),
            metrics: Arc::new(metrics),
        })
    }
}
