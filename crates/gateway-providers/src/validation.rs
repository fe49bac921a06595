//! Pre-dispatch checks.
//!
//! Checks run in a fixed order and the first failure wins:
//! provider active, model registered, endpoint registered and active,
//! streaming capability. Nothing is rendered or sent before they pass.

use gateway_core::{
    ConfigurationErrorKind, Endpoint, GatewayError, GatewayRequest, GatewayResult, Model, Provider,
};

/// How the response will be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchMode {
    /// Single JSON response
    Buffered,
    /// Server-sent event stream
    Streaming,
}

impl DispatchMode {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buffered => "buffered",
            Self::Streaming => "streaming",
        }
    }
}

/// The model and endpoint a validated request resolved to
#[derive(Debug, Clone, Copy)]
pub struct DispatchTarget<'a> {
    /// Resolved model
    pub model: &'a Model,
    /// Resolved endpoint
    pub endpoint: &'a Endpoint,
}

/// Validate `request` against a provider snapshot
pub fn validate_dispatch<'a>(
    provider: &'a Provider,
    request: &GatewayRequest,
    mode: DispatchMode,
) -> GatewayResult<DispatchTarget<'a>> {
    if !provider.is_active() {
        return Err(GatewayError::configuration(
            ConfigurationErrorKind::ProviderInactive,
            format!("provider '{}' is not active", provider.name()),
        ));
    }

    let model = provider.model(&request.model_key).ok_or_else(|| {
        GatewayError::configuration(
            ConfigurationErrorKind::ModelNotFound,
            format!(
                "model '{}' is not supported by provider '{}'",
                request.model_key,
                provider.name()
            ),
        )
    })?;

    let endpoint = provider.endpoint(&request.endpoint).ok_or_else(|| {
        GatewayError::configuration(
            ConfigurationErrorKind::EndpointNotFound,
            format!(
                "endpoint '{}' is not registered on provider '{}'",
                request.endpoint,
                provider.name()
            ),
        )
    })?;
    if !endpoint.is_active() {
        return Err(GatewayError::configuration(
            ConfigurationErrorKind::EndpointInactive,
            format!("endpoint '{}' is not active", endpoint.name()),
        ));
    }

    let wants_stream = mode == DispatchMode::Streaming || request.stream;
    if wants_stream && !model.supports_streaming() {
        return Err(GatewayError::configuration(
            ConfigurationErrorKind::StreamingUnsupported,
            format!("model '{}' does not support streaming", model.key()),
        ));
    }

    Ok(DispatchTarget { model, endpoint })
}
