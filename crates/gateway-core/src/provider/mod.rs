//! The provider aggregate.
//!
//! A [`Provider`] describes one upstream API: where it lives, how to
//! authenticate, the two templates that translate between the canonical and
//! provider wire formats, and the models and endpoints it exposes. Model keys
//! and endpoint names are unique within a provider; every mutation that could
//! break this fails before touching any state.

mod auth;
mod collection;
mod endpoint;
mod model;

pub use auth::{AuthConfig, AuthScheme, NewAuthConfig};
pub use collection::{Keyed, KeyedCollection};
pub use endpoint::{Endpoint, EndpointHealth, EndpointStatus, NewEndpoint};
pub use model::{Capabilities, Limits, Model, NewModel, Pricing, PricingUnit};

use crate::error::{GatewayError, GatewayResult};
use crate::types::{ModelId, ProviderId};
use chrono::{DateTime, Utc};
use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Provider lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    /// Accepts dispatches
    #[default]
    Active,
    /// Rejected by the dispatch validator
    Inactive,
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Inactive => f.write_str("inactive"),
        }
    }
}

/// Input for creating a provider
#[derive(Debug, Clone, Deserialize)]
pub struct NewProvider {
    /// Fixed identifier; generated when absent
    #[serde(default)]
    pub id: Option<ProviderId>,
    /// Display name
    pub name: String,
    /// Absolute base URL
    pub base_url: String,
    /// Authentication
    pub auth: NewAuthConfig,
    /// Static headers sent on every call
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request template source
    pub request_template: String,
    /// Response template source
    pub response_template: String,
}

/// One configured upstream
#[derive(Debug, Clone, Serialize)]
pub struct Provider {
    id: ProviderId,
    name: String,
    base_url: String,
    auth: AuthConfig,
    headers: BTreeMap<String, String>,
    status: ProviderStatus,
    request_template: String,
    response_template: String,
    models: KeyedCollection<Model>,
    endpoints: KeyedCollection<Endpoint>,
    updated_at: DateTime<Utc>,
}

impl Provider {
    /// Validate and build an active provider with no models or endpoints
    pub fn new(input: NewProvider) -> GatewayResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(GatewayError::validation("provider name is required", Some("name")));
        }

        let base_url = input.base_url.trim().to_string();
        match Url::parse(&base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(GatewayError::validation(
                    format!("unsupported base URL scheme '{}'", url.scheme()),
                    Some("base_url"),
                ))
            }
            Err(e) => {
                return Err(GatewayError::validation(
                    format!("invalid base URL: {e}"),
                    Some("base_url"),
                ))
            }
        }

        for (name, value) in &input.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                GatewayError::validation(
                    format!("invalid static header name '{name}': {e}"),
                    Some("headers"),
                )
            })?;
            HeaderValue::from_str(value).map_err(|e| {
                GatewayError::validation(
                    format!("invalid value for static header '{name}': {e}"),
                    Some("headers"),
                )
            })?;
        }

        let auth = AuthConfig::new(input.auth)?;
        validate_template(&input.request_template, "request_template")?;
        validate_template(&input.response_template, "response_template")?;

        Ok(Self {
            id: input.id.unwrap_or_else(ProviderId::generate),
            name,
            base_url,
            auth,
            headers: input.headers,
            status: ProviderStatus::Active,
            request_template: input.request_template,
            response_template: input.response_template,
            models: KeyedCollection::new(),
            endpoints: KeyedCollection::new(),
            updated_at: Utc::now(),
        })
    }

    /// Identifier
    pub fn id(&self) -> ProviderId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authentication settings
    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    /// Static headers
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Lifecycle status
    pub fn status(&self) -> ProviderStatus {
        self.status
    }

    /// Whether the provider accepts dispatches
    pub fn is_active(&self) -> bool {
        self.status == ProviderStatus::Active
    }

    /// Request template source
    pub fn request_template(&self) -> &str {
        &self.request_template
    }

    /// Response template source
    pub fn response_template(&self) -> &str {
        &self.response_template
    }

    /// Models in registration order
    pub fn models(&self) -> &KeyedCollection<Model> {
        &self.models
    }

    /// Endpoints in registration order
    pub fn endpoints(&self) -> &KeyedCollection<Endpoint> {
        &self.endpoints
    }

    /// Model by dispatch key
    pub fn model(&self, key: &str) -> Option<&Model> {
        self.models.get(key)
    }

    /// Endpoint by name
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    /// Last mutation time
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Register a model; fails if the key is already taken
    pub fn add_model(&mut self, input: NewModel) -> GatewayResult<ModelId> {
        let model = Model::new(input)?;
        let id = model.id();
        self.models.try_insert(model)?;
        self.touch();
        Ok(id)
    }

    /// Remove a model by id
    pub fn remove_model(&mut self, id: ModelId) -> GatewayResult<Model> {
        let key = self
            .models
            .find(|m| m.id() == id)
            .map(|m| m.key().to_string())
            .ok_or_else(|| GatewayError::not_found("Model", id.to_string()))?;
        let removed = self.models.remove(&key)?;
        self.touch();
        Ok(removed)
    }

    /// Register an endpoint; fails if the name or the path is already taken
    pub fn add_endpoint(&mut self, input: NewEndpoint) -> GatewayResult<()> {
        let endpoint = Endpoint::new(input)?;
        if let Some(existing) = self.endpoints.find(|e| e.path() == endpoint.path()) {
            return Err(GatewayError::conflict(format!(
                "endpoint path '{}' is already used by '{}'",
                endpoint.path(),
                existing.name()
            )));
        }
        self.endpoints.try_insert(endpoint)?;
        self.touch();
        Ok(())
    }

    /// Remove an endpoint by name
    pub fn remove_endpoint(&mut self, name: &str) -> GatewayResult<Endpoint> {
        let removed = self.endpoints.remove(name)?;
        self.touch();
        Ok(removed)
    }

    /// Activate an inactive endpoint
    pub fn activate_endpoint(&mut self, name: &str) -> GatewayResult<()> {
        self.endpoint_mut(name)?.activate()?;
        self.touch();
        Ok(())
    }

    /// Deactivate an active endpoint, resetting its health
    pub fn deactivate_endpoint(&mut self, name: &str) -> GatewayResult<()> {
        self.endpoint_mut(name)?.deactivate()?;
        self.touch();
        Ok(())
    }

    /// Activate the provider
    pub fn activate(&mut self) -> GatewayResult<()> {
        if self.is_active() {
            return Err(GatewayError::conflict("provider is already active"));
        }
        self.status = ProviderStatus::Active;
        self.touch();
        Ok(())
    }

    /// Deactivate the provider
    pub fn deactivate(&mut self) -> GatewayResult<()> {
        if !self.is_active() {
            return Err(GatewayError::conflict("provider is already inactive"));
        }
        self.status = ProviderStatus::Inactive;
        self.touch();
        Ok(())
    }

    /// Replace the request template
    pub fn replace_request_template(&mut self, template: impl Into<String>) -> GatewayResult<()> {
        let template = template.into();
        validate_template(&template, "request_template")?;
        self.request_template = template;
        self.touch();
        Ok(())
    }

    /// Replace the response template
    pub fn replace_response_template(&mut self, template: impl Into<String>) -> GatewayResult<()> {
        let template = template.into();
        validate_template(&template, "response_template")?;
        self.response_template = template;
        self.touch();
        Ok(())
    }

    fn endpoint_mut(&mut self, name: &str) -> GatewayResult<&mut Endpoint> {
        self.endpoints
            .get_mut(name)
            .ok_or_else(|| GatewayError::not_found("Endpoint", name))
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_template(source: &str, field: &str) -> GatewayResult<()> {
    if source.trim().is_empty() {
        return Err(GatewayError::validation(
            format!("{field} must not be empty"),
            Some(field),
        ));
    }
    Ok(())
}
