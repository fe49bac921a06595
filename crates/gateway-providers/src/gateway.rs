//! Dispatch orchestration.
//!
//! Every dispatch loads a provider snapshot, validates, renders the request
//! template, and sends. Provider, model and endpoint checks run before the
//! request's own shape is checked, so a disabled provider is always reported
//! as such. Buffered calls render the response template once over
//! the decoded body; streaming calls hand the byte stream to the multiplexer.

use crate::sse::{ResponseStream, StreamMultiplexer, DEFAULT_CHANNEL_CAPACITY};
use crate::template::CompiledTemplates;
use crate::transport::{build_headers, UpstreamRequest, UpstreamTransport};
use crate::validation::{validate_dispatch, DispatchMode};
use bytes::Bytes;
use gateway_core::{
    ConfigurationErrorKind, DecodeStage, Endpoint, GatewayError, GatewayRequest, GatewayResponse,
    GatewayResult, Provider, ProviderRepository,
};
use gateway_telemetry::dispatch_span;
use http::{HeaderMap, Method};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, Instrument};

/// Join a base URL and an endpoint path with exactly one `/`
#[must_use]
pub fn join_target(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Routes canonical requests to configured providers
#[derive(Clone)]
pub struct ProviderGateway {
    repository: Arc<dyn ProviderRepository>,
    transport: Arc<dyn UpstreamTransport>,
    multiplexer: StreamMultiplexer,
}

impl std::fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("multiplexer", &self.multiplexer)
            .finish_non_exhaustive()
    }
}

impl ProviderGateway {
    /// Create a gateway with the default channel capacity
    pub fn new(
        repository: Arc<dyn ProviderRepository>,
        transport: Arc<dyn UpstreamTransport>,
    ) -> Self {
        Self {
            repository,
            transport,
            multiplexer: StreamMultiplexer::new(DEFAULT_CHANNEL_CAPACITY),
        }
    }

    /// Override the streaming channel capacity
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.multiplexer = StreamMultiplexer::new(capacity);
        self
    }

    /// Dispatch and wait for the full response
    pub async fn dispatch(
        &self,
        request: &GatewayRequest,
        cancel: &CancellationToken,
    ) -> GatewayResult<GatewayResponse> {
        let provider = self.snapshot(request).await?;
        let span = dispatch_span!(
            provider.name(),
            request.endpoint,
            request.model_key,
            DispatchMode::Buffered.as_str()
        );

        async {
            let target = validate_dispatch(&provider, request, DispatchMode::Buffered)?;
            request.validate()?;
            let templates =
                CompiledTemplates::compile(provider.request_template(), provider.response_template())?;
            let body = templates.render_request(request)?;
            let upstream = prepare(&provider, target.endpoint, body, false)?;

            debug!(url = %upstream.target, "Sending upstream request");
            let response = self.transport.send(upstream, cancel).await?;
            info!(
                status = response.status,
                latency_ms = response.latency.as_millis() as u64,
                "Upstream responded"
            );

            let payload: Value = serde_json::from_slice(&response.body)
                .map_err(|e| GatewayError::decode(DecodeStage::ProviderResponse, e.to_string()))?;
            templates.render_response(&payload)
        }
        .instrument(span)
        .await
    }

    /// Dispatch in streaming mode.
    ///
    /// Returns once upstream headers have arrived; chunks then flow through
    /// the returned stream until the terminator, upstream close, or `cancel`.
    pub async fn dispatch_stream(
        &self,
        request: &GatewayRequest,
        cancel: CancellationToken,
    ) -> GatewayResult<ResponseStream> {
        let provider = self.snapshot(request).await?;
        let span = dispatch_span!(
            provider.name(),
            request.endpoint,
            request.model_key,
            DispatchMode::Streaming.as_str()
        );

        async {
            let target = validate_dispatch(&provider, request, DispatchMode::Streaming)?;
            request.validate()?;
            let templates =
                CompiledTemplates::compile(provider.request_template(), provider.response_template())?;

            let mut streaming = request.clone();
            streaming.stream = true;
            let body = templates.render_request(&streaming)?;
            let upstream = prepare(&provider, target.endpoint, body, true)?;

            debug!(url = %upstream.target, "Opening upstream stream");
            let bytes = self.transport.open_stream(upstream, &cancel).await?;
            let stream = self
                .multiplexer
                .spawn(bytes, Arc::new(templates), cancel, provider.name());
            Ok::<_, GatewayError>(stream)
        }
        .instrument(span)
        .await
    }

    async fn snapshot(&self, request: &GatewayRequest) -> GatewayResult<Arc<Provider>> {
        self.repository
            .get_by_id(request.provider_id)
            .await?
            .ok_or_else(|| {
                GatewayError::configuration(
                    ConfigurationErrorKind::ProviderNotFound,
                    format!("provider '{}' not found", request.provider_id),
                )
            })
    }
}

fn prepare(
    provider: &Provider,
    endpoint: &Endpoint,
    body: String,
    streaming: bool,
) -> GatewayResult<UpstreamRequest> {
    let auth = provider.auth();
    let auth_value = auth.header_value();

    let mut pairs: Vec<(&str, &str, bool)> = vec![("Content-Type", "application/json", false)];
    if streaming {
        pairs.push(("Accept", "text/event-stream", false));
    }
    pairs.extend(
        provider
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str(), false)),
    );
    pairs.push((auth.header(), auth_value.expose_secret().as_str(), true));
    let headers: HeaderMap = build_headers(pairs)?;

    Ok(UpstreamRequest {
        target: join_target(provider.base_url(), endpoint.path()),
        method: Method::POST,
        headers,
        body: Bytes::from(body),
    })
}
