//! Provider persistence seam.
//!
//! Dispatch only ever calls [`ProviderRepository::get_by_id`] and works on the
//! returned snapshot. Administrative mutations go through
//! [`ProviderRepository::update`], which applies a closure to a private copy
//! and publishes it only if the closure succeeds.

use crate::error::{GatewayError, GatewayResult};
use crate::provider::Provider;
use crate::types::ProviderId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// A mutation applied under the repository's update lock
pub type ProviderMutation = Box<dyn FnOnce(&mut Provider) -> GatewayResult<()> + Send>;

/// Storage for provider configuration
#[async_trait]
pub trait ProviderRepository: Send + Sync {
    /// Immutable snapshot of one provider
    async fn get_by_id(&self, id: ProviderId) -> GatewayResult<Option<Arc<Provider>>>;

    /// Snapshots of all providers
    async fn get_all(&self) -> GatewayResult<Vec<Arc<Provider>>>;

    /// Insert or replace a provider
    async fn save(&self, provider: Provider) -> GatewayResult<()>;

    /// Delete a provider; returns whether it existed
    async fn delete(&self, id: ProviderId) -> GatewayResult<bool>;

    /// Apply `mutation` atomically; the stored provider is unchanged on error
    async fn update(
        &self,
        id: ProviderId,
        mutation: ProviderMutation,
    ) -> GatewayResult<Arc<Provider>>;
}

/// Process-local repository
#[derive(Debug, Default)]
pub struct InMemoryProviderRepository {
    providers: DashMap<ProviderId, Arc<Provider>>,
}

impl InMemoryProviderRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no providers are stored
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl ProviderRepository for InMemoryProviderRepository {
    async fn get_by_id(&self, id: ProviderId) -> GatewayResult<Option<Arc<Provider>>> {
        Ok(self.providers.get(&id).map(|entry| Arc::clone(entry.value())))
    }

    async fn get_all(&self) -> GatewayResult<Vec<Arc<Provider>>> {
        let mut providers: Vec<_> = self
            .providers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        providers.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
        Ok(providers)
    }

    async fn save(&self, provider: Provider) -> GatewayResult<()> {
        debug!(provider_id = %provider.id(), name = provider.name(), "Saving provider");
        self.providers.insert(provider.id(), Arc::new(provider));
        Ok(())
    }

    async fn delete(&self, id: ProviderId) -> GatewayResult<bool> {
        Ok(self.providers.remove(&id).is_some())
    }

    async fn update(
        &self,
        id: ProviderId,
        mutation: ProviderMutation,
    ) -> GatewayResult<Arc<Provider>> {
        // The entry guard holds the shard write lock until the new snapshot
        // is published.
        let mut entry = self
            .providers
            .get_mut(&id)
            .ok_or_else(|| GatewayError::not_found("Provider", id.to_string()))?;

        let mut draft = Provider::clone(entry.value());
        mutation(&mut draft)?;

        let updated = Arc::new(draft);
        *entry.value_mut() = Arc::clone(&updated);
        Ok(updated)
    }
}
