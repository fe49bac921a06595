//! Provider administration service.
//!
//! Thin workflow layer over [`ProviderRepository`]: every mutation runs
//! through the repository's update path so that a failed change never leaves
//! a half-applied provider behind.

use crate::error::{GatewayError, GatewayResult};
use crate::provider::{NewEndpoint, NewModel, NewProvider, Provider};
use crate::repository::ProviderRepository;
use crate::types::{ModelId, ProviderId};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Replacement templates; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateUpdate {
    /// New request template
    #[serde(default)]
    pub request_template: Option<String>,
    /// New response template
    #[serde(default)]
    pub response_template: Option<String>,
}

impl TemplateUpdate {
    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.request_template.is_none() && self.response_template.is_none()
    }
}

/// Administration workflow for providers
#[derive(Clone)]
pub struct ProviderAdmin {
    repository: Arc<dyn ProviderRepository>,
}

impl std::fmt::Debug for ProviderAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAdmin").finish_non_exhaustive()
    }
}

impl ProviderAdmin {
    /// Create the service over a repository
    pub fn new(repository: Arc<dyn ProviderRepository>) -> Self {
        Self { repository }
    }

    /// Validate and store a new provider
    pub async fn create_provider(&self, input: NewProvider) -> GatewayResult<Arc<Provider>> {
        let provider = Provider::new(input)?;
        let id = provider.id();
        if self.repository.get_by_id(id).await?.is_some() {
            return Err(GatewayError::conflict(format!(
                "provider '{id}' already exists"
            )));
        }

        info!(provider_id = %id, name = provider.name(), "Creating provider");
        let snapshot = Arc::new(provider.clone());
        self.repository.save(provider).await?;
        Ok(snapshot)
    }

    /// Fetch one provider
    pub async fn get_provider(&self, id: ProviderId) -> GatewayResult<Arc<Provider>> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::not_found("Provider", id.to_string()))
    }

    /// All providers
    pub async fn list_providers(&self) -> GatewayResult<Vec<Arc<Provider>>> {
        self.repository.get_all().await
    }

    /// Delete a provider
    pub async fn remove_provider(&self, id: ProviderId) -> GatewayResult<()> {
        if !self.repository.delete(id).await? {
            return Err(GatewayError::not_found("Provider", id.to_string()));
        }
        info!(provider_id = %id, "Removed provider");
        Ok(())
    }

    /// Add several models; nothing is saved unless every model is accepted
    pub async fn add_models(
        &self,
        id: ProviderId,
        models: Vec<NewModel>,
    ) -> GatewayResult<Vec<ModelId>> {
        let added = Arc::new(Mutex::new(Vec::with_capacity(models.len())));
        let sink = Arc::clone(&added);

        self.repository
            .update(
                id,
                Box::new(move |provider: &mut Provider| {
                    let mut ids = Vec::with_capacity(models.len());
                    let mut errors = Vec::new();
                    for model in models {
                        match provider.add_model(model) {
                            Ok(model_id) => ids.push(model_id),
                            Err(e) => errors.push(e),
                        }
                    }
                    if let Some(err) = GatewayError::from_batch(errors) {
                        return Err(err);
                    }
                    if let Ok(mut sink) = sink.lock() {
                        *sink = ids;
                    }
                    Ok(())
                }),
            )
            .await?;

        let ids = added
            .lock()
            .map(|ids| ids.clone())
            .map_err(|_| GatewayError::internal("model id sink poisoned"))?;
        info!(provider_id = %id, count = ids.len(), "Added models");
        Ok(ids)
    }

    /// Remove one model by id
    pub async fn remove_model(&self, id: ProviderId, model_id: ModelId) -> GatewayResult<()> {
        self.repository
            .update(
                id,
                Box::new(move |provider: &mut Provider| provider.remove_model(model_id).map(drop)),
            )
            .await?;
        Ok(())
    }

    /// Add several endpoints; nothing is saved unless every endpoint is accepted
    pub async fn add_endpoints(
        &self,
        id: ProviderId,
        endpoints: Vec<NewEndpoint>,
    ) -> GatewayResult<Arc<Provider>> {
        let updated = self
            .repository
            .update(
                id,
                Box::new(move |provider: &mut Provider| {
                    let errors: Vec<_> = endpoints
                        .into_iter()
                        .filter_map(|endpoint| provider.add_endpoint(endpoint).err())
                        .collect();
                    GatewayError::from_batch(errors).map_or(Ok(()), Err)
                }),
            )
            .await?;
        info!(provider_id = %id, count = updated.endpoints().len(), "Endpoints updated");
        Ok(updated)
    }

    /// Remove one endpoint by name
    pub async fn remove_endpoint(&self, id: ProviderId, name: &str) -> GatewayResult<()> {
        let name = name.to_string();
        self.repository
            .update(
                id,
                Box::new(move |provider: &mut Provider| provider.remove_endpoint(&name).map(drop)),
            )
            .await?;
        Ok(())
    }

    /// Activate an endpoint
    pub async fn activate_endpoint(&self, id: ProviderId, name: &str) -> GatewayResult<()> {
        let name = name.to_string();
        self.repository
            .update(
                id,
                Box::new(move |provider: &mut Provider| provider.activate_endpoint(&name)),
            )
            .await?;
        Ok(())
    }

    /// Deactivate an endpoint
    pub async fn deactivate_endpoint(&self, id: ProviderId, name: &str) -> GatewayResult<()> {
        let name = name.to_string();
        self.repository
            .update(
                id,
                Box::new(move |provider: &mut Provider| provider.deactivate_endpoint(&name)),
            )
            .await?;
        Ok(())
    }

    /// Activate a provider
    pub async fn activate_provider(&self, id: ProviderId) -> GatewayResult<()> {
        self.repository
            .update(id, Box::new(|provider: &mut Provider| provider.activate()))
            .await?;
        info!(provider_id = %id, "Provider activated");
        Ok(())
    }

    /// Deactivate a provider
    pub async fn deactivate_provider(&self, id: ProviderId) -> GatewayResult<()> {
        self.repository
            .update(id, Box::new(|provider: &mut Provider| provider.deactivate()))
            .await?;
        info!(provider_id = %id, "Provider deactivated");
        Ok(())
    }

    /// Replace one or both templates
    pub async fn update_templates(
        &self,
        id: ProviderId,
        update: TemplateUpdate,
    ) -> GatewayResult<Arc<Provider>> {
        if update.is_empty() {
            return Err(GatewayError::validation(
                "at least one template must be provided",
                None,
            ));
        }
        self.repository
            .update(
                id,
                Box::new(move |provider: &mut Provider| {
                    if let Some(template) = update.request_template {
                        provider.replace_request_template(template)?;
                    }
                    if let Some(template) = update.response_template {
                        provider.replace_response_template(template)?;
                    }
                    Ok(())
                }),
            )
            .await
    }
}
