//! Models offered by a provider.

use super::collection::Keyed;
use crate::error::{GatewayError, GatewayResult};
use crate::types::ModelId;
use serde::{Deserialize, Serialize};

/// Feature flags checked at dispatch time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Accepts tool definitions
    #[serde(default)]
    pub function_calling: bool,
    /// Can answer with a server-sent event stream
    #[serde(default)]
    pub streaming: bool,
}

/// Token limits, informational
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Context window size in tokens
    #[serde(default)]
    pub context_window: u32,
    /// Maximum tokens the model will emit
    #[serde(default)]
    pub max_output_tokens: u32,
}

/// Unit the token prices are quoted in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingUnit {
    /// Price per 1000 tokens
    #[default]
    #[serde(rename = "per_1000_tokens")]
    PerThousandTokens,
    /// Price per 1,000,000 tokens
    #[serde(rename = "per_1000000_tokens")]
    PerMillionTokens,
}

/// Token pricing, informational
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    /// Prompt token price
    #[serde(default)]
    pub prompt_token_price: f64,
    /// Completion token price
    #[serde(default)]
    pub completion_token_price: f64,
    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Pricing unit
    #[serde(default)]
    pub unit: PricingUnit,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            prompt_token_price: 0.0,
            completion_token_price: 0.0,
            currency: default_currency(),
            unit: PricingUnit::default(),
        }
    }
}

/// Input for adding a model
#[derive(Debug, Clone, Deserialize)]
pub struct NewModel {
    /// Display name
    pub name: String,
    /// Dispatch key
    pub key: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Capabilities
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Limits
    #[serde(default)]
    pub limits: Limits,
    /// Pricing
    #[serde(default)]
    pub pricing: Pricing,
}

/// A model registered on a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    id: ModelId,
    name: String,
    key: String,
    description: String,
    capabilities: Capabilities,
    limits: Limits,
    pricing: Pricing,
}

impl Model {
    /// Validate and build
    pub fn new(input: NewModel) -> GatewayResult<Self> {
        let key = input.key.trim().to_string();
        if key.is_empty() {
            return Err(GatewayError::validation("model key is required", Some("key")));
        }
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(GatewayError::validation("model name is required", Some("name")));
        }
        if input.pricing.prompt_token_price < 0.0 || input.pricing.completion_token_price < 0.0 {
            return Err(GatewayError::validation(
                "token prices must not be negative",
                Some("pricing"),
            ));
        }

        Ok(Self {
            id: ModelId::generate(),
            name,
            key,
            description: input.description,
            capabilities: input.capabilities,
            limits: input.limits,
            pricing: input.pricing,
        })
    }

    /// Identifier
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dispatch key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Capabilities
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Limits
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Pricing
    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    /// Shorthand for the streaming capability
    pub fn supports_streaming(&self) -> bool {
        self.capabilities.streaming
    }
}

impl Keyed for Model {
    const ENTITY: &'static str = "Model";

    fn key(&self) -> &str {
        &self.key
    }
}
