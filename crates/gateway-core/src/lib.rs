//! # Gateway Core
//!
//! Core types and error handling for the provider gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - The provider aggregate (models, endpoints, auth, templates)
//! - Canonical request and response types
//! - The error taxonomy shared by every dispatch stage
//! - The persistence seam and the administration service built on it

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admin;
pub mod error;
pub mod provider;
pub mod repository;
pub mod request;
pub mod response;
pub mod types;

// Re-export commonly used types
pub use admin::{ProviderAdmin, TemplateUpdate};
pub use error::{ConfigurationErrorKind, DecodeStage, GatewayError, GatewayResult, TemplateStage};
pub use provider::{
    AuthConfig, AuthScheme, Capabilities, Endpoint, EndpointHealth, EndpointStatus, Keyed,
    KeyedCollection, Limits, Model, NewAuthConfig, NewEndpoint, NewModel, NewProvider, Pricing,
    PricingUnit, Provider, ProviderStatus,
};
pub use repository::{InMemoryProviderRepository, ProviderMutation, ProviderRepository};
pub use request::{
    ChatMessage, ContentPart, FunctionCall, GatewayRequest, MessageContent, MessageRole,
    ParameterProperty, ParameterSchema, PartType, Tool, ToolCall, ToolChoice, ToolChoiceType,
    ToolDefinition, ToolType,
};
pub use response::{Choice, FinishReason, GatewayResponse, ResponseMessage, SearchResult, Usage};
pub use types::{ModelId, ProviderId};
