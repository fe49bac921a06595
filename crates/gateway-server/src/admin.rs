//! Provider administration handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::{ModelId, NewEndpoint, NewModel, NewProvider, Provider, ProviderId, TemplateUpdate};
use serde::Serialize;
use std::sync::Arc;

use crate::{error::ApiError, extractors::JsonBody, state::AppState};

/// Ids assigned to newly added models
#[derive(Debug, Serialize)]
pub struct AddedModels {
    /// Model ids in request order
    pub ids: Vec<ModelId>,
}

fn provider_json(provider: &Arc<Provider>) -> Json<Provider> {
    Json(provider.as_ref().clone())
}

/// `GET /admin/providers`
pub async fn list_providers(State(state): State<AppState>) -> Result<Json<Vec<Provider>>, ApiError> {
    let providers = state.admin.list_providers().await?;
    Ok(Json(providers.iter().map(|p| p.as_ref().clone()).collect()))
}

/// `POST /admin/providers`
pub async fn create_provider(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NewProvider>,
) -> Result<Response, ApiError> {
    let provider = state.admin.create_provider(input).await?;
    Ok((StatusCode::CREATED, provider_json(&provider)).into_response())
}

/// `GET /admin/providers/:id`
pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<ProviderId>,
) -> Result<Json<Provider>, ApiError> {
    let provider = state.admin.get_provider(id).await?;
    Ok(provider_json(&provider))
}

/// `DELETE /admin/providers/:id`
pub async fn remove_provider(
    State(state): State<AppState>,
    Path(id): Path<ProviderId>,
) -> Result<StatusCode, ApiError> {
    state.admin.remove_provider(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/providers/:id/activate`
pub async fn activate_provider(
    State(state): State<AppState>,
    Path(id): Path<ProviderId>,
) -> Result<StatusCode, ApiError> {
    state.admin.activate_provider(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/providers/:id/deactivate`
pub async fn deactivate_provider(
    State(state): State<AppState>,
    Path(id): Path<ProviderId>,
) -> Result<StatusCode, ApiError> {
    state.admin.deactivate_provider(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/providers/:id/models`
pub async fn add_models(
    State(state): State<AppState>,
    Path(id): Path<ProviderId>,
    JsonBody(models): JsonBody<Vec<NewModel>>,
) -> Result<Response, ApiError> {
    if models.is_empty() {
        return Err(ApiError::bad_request("at least one model is required"));
    }
    let ids = state.admin.add_models(id, models).await?;
    Ok((StatusCode::CREATED, Json(AddedModels { ids })).into_response())
}

/// `DELETE /admin/providers/:id/models/:model_id`
pub async fn remove_model(
    State(state): State<AppState>,
    Path((id, model_id)): Path<(ProviderId, ModelId)>,
) -> Result<StatusCode, ApiError> {
    state.admin.remove_model(id, model_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/providers/:id/endpoints`
pub async fn add_endpoints(
    State(state): State<AppState>,
    Path(id): Path<ProviderId>,
    JsonBody(endpoints): JsonBody<Vec<NewEndpoint>>,
) -> Result<Response, ApiError> {
    if endpoints.is_empty() {
        return Err(ApiError::bad_request("at least one endpoint is required"));
    }
    let provider = state.admin.add_endpoints(id, endpoints).await?;
    Ok((StatusCode::CREATED, provider_json(&provider)).into_response())
}

/// `DELETE /admin/providers/:id/endpoints/:name`
pub async fn remove_endpoint(
    State(state): State<AppState>,
    Path((id, name)): Path<(ProviderId, String)>,
) -> Result<StatusCode, ApiError> {
    state.admin.remove_endpoint(id, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/providers/:id/endpoints/:name/activate`
pub async fn activate_endpoint(
    State(state): State<AppState>,
    Path((id, name)): Path<(ProviderId, String)>,
) -> Result<StatusCode, ApiError> {
    state.admin.activate_endpoint(id, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/providers/:id/endpoints/:name/deactivate`
pub async fn deactivate_endpoint(
    State(state): State<AppState>,
    Path((id, name)): Path<(ProviderId, String)>,
) -> Result<StatusCode, ApiError> {
    state.admin.deactivate_endpoint(id, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /admin/providers/:id/templates`
pub async fn update_templates(
    State(state): State<AppState>,
    Path(id): Path<ProviderId>,
    JsonBody(update): JsonBody<TemplateUpdate>,
) -> Result<Json<Provider>, ApiError> {
    let provider = state.admin.update_templates(id, update).await?;
    Ok(provider_json(&provider))
}
