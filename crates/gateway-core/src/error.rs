//! Error types for the gateway.
//!
//! Dispatch failures fall into four families: configuration, template,
//! transport and decode. The remaining variants belong to the administration
//! path (validation, lookups, conflicting mutations).

use std::fmt;
use thiserror::Error;

/// Result alias used across the gateway crates
pub type GatewayResult<T> = Result<T, GatewayError>;

/// What part of the provider configuration rejected a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigurationErrorKind {
    /// No provider with the requested id
    ProviderNotFound,
    /// Provider exists but is inactive
    ProviderInactive,
    /// Model key is not registered on the provider
    ModelNotFound,
    /// Endpoint name is not registered on the provider
    EndpointNotFound,
    /// Endpoint exists but is inactive
    EndpointInactive,
    /// Streaming requested for a model without the streaming capability
    StreamingUnsupported,
}

impl ConfigurationErrorKind {
    /// Stable machine-readable code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ProviderNotFound => "provider_not_found",
            Self::ProviderInactive => "provider_inactive",
            Self::ModelNotFound => "model_not_found",
            Self::EndpointNotFound => "endpoint_not_found",
            Self::EndpointInactive => "endpoint_inactive",
            Self::StreamingUnsupported => "streaming_unsupported",
        }
    }
}

impl fmt::Display for ConfigurationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which template failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateStage {
    /// Canonical request to provider request
    Request,
    /// Provider response (or stream frame) to canonical response
    Response,
}

impl fmt::Display for TemplateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
        }
    }
}

/// Which payload failed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStage {
    /// Rendered request template is not valid JSON
    RequestBody,
    /// Upstream body is not valid JSON
    ProviderResponse,
    /// Rendered response template is not a canonical response
    ResponseBody,
    /// A single server-sent event payload
    StreamFrame,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestBody => f.write_str("request body"),
            Self::ProviderResponse => f.write_str("provider response"),
            Self::ResponseBody => f.write_str("response body"),
            Self::StreamFrame => f.write_str("stream frame"),
        }
    }
}

/// Gateway error taxonomy
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Provider, model or endpoint cannot serve the request
    #[error("Configuration error ({kind}): {message}")]
    Configuration {
        /// Which check failed
        kind: ConfigurationErrorKind,
        /// Human readable detail
        message: String,
    },

    /// Template compile or execution failure
    #[error("Template error ({stage}): {message}")]
    Template {
        /// Which template failed
        stage: TemplateStage,
        /// Engine message
        message: String,
    },

    /// Network failure or non-success upstream status
    #[error("Transport error: {message}")]
    Transport {
        /// Error message
        message: String,
        /// Upstream HTTP status, when one was received
        status: Option<u16>,
        /// Upstream body kept for diagnostics
        body: Option<String>,
    },

    /// Payload is not valid or not of the expected shape
    #[error("Decode error ({stage}): {message}")]
    Decode {
        /// Which payload failed
        stage: DecodeStage,
        /// Parser message
        message: String,
    },

    /// Caller cancelled the operation
    #[error("Request cancelled")]
    Cancelled,

    /// Invalid input on the administration path
    #[error("Validation error: {message}")]
    Validation {
        /// Error message
        message: String,
        /// Field that failed validation
        field: Option<String>,
    },

    /// Entity lookup failed
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Key that was looked up
        key: String,
    },

    /// Mutation collides with existing state
    #[error("Conflict: {message}")]
    Conflict {
        /// Error message
        message: String,
    },

    /// Several independent failures from one batch operation
    #[error("{}", join_errors(.errors))]
    Multiple {
        /// Individual failures, in input order
        errors: Vec<GatewayError>,
    },

    /// Unexpected internal failure
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

fn join_errors(errors: &[GatewayError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl GatewayError {
    /// Create a configuration error
    pub fn configuration(kind: ConfigurationErrorKind, message: impl Into<String>) -> Self {
        Self::Configuration {
            kind,
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template(stage: TemplateStage, message: impl Into<String>) -> Self {
        Self::Template {
            stage,
            message: message.into(),
        }
    }

    /// Create a transport error without an upstream status
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Create a transport error for a non-success upstream status
    pub fn upstream_status(status: u16, body: Option<String>) -> Self {
        Self::Transport {
            message: format!("provider returned error status {status}"),
            status: Some(status),
            body,
        }
    }

    /// Create a decode error
    pub fn decode(stage: DecodeStage, message: impl Into<String>) -> Self {
        Self::Decode {
            stage,
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Validation {
            message: message.into(),
            field: field.map(ToString::to_string),
        }
    }

    /// Create a not-found error
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Collapse a batch of failures; a single failure is returned as-is
    #[must_use]
    pub fn from_batch(mut errors: Vec<Self>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple { errors }),
        }
    }

    /// Configuration kind, if this is a configuration error
    #[must_use]
    pub const fn configuration_kind(&self) -> Option<ConfigurationErrorKind> {
        match self {
            Self::Configuration { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether this error came from pre-dispatch validation
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Whether this is a template failure
    #[must_use]
    pub const fn is_template(&self) -> bool {
        matches!(self, Self::Template { .. })
    }

    /// Whether this is a transport failure
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether this is a decode failure
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Short label used for logs and metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Template { .. } => "template",
            Self::Transport { .. } => "transport",
            Self::Decode { .. } => "decode",
            Self::Cancelled => "cancelled",
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Multiple { .. } => "multiple",
            Self::Internal { .. } => "internal",
        }
    }
}
