//! Route definitions for the gateway API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{admin, handlers, state::AppState};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/v1/proxy", post(handlers::proxy))
        .nest("/admin", admin_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Provider administration routes
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/providers",
            get(admin::list_providers).post(admin::create_provider),
        )
        .route(
            "/providers/:id",
            get(admin::get_provider).delete(admin::remove_provider),
        )
        .route("/providers/:id/activate", post(admin::activate_provider))
        .route("/providers/:id/deactivate", post(admin::deactivate_provider))
        .route("/providers/:id/models", post(admin::add_models))
        .route(
            "/providers/:id/models/:model_id",
            axum::routing::delete(admin::remove_model),
        )
        .route("/providers/:id/endpoints", post(admin::add_endpoints))
        .route(
            "/providers/:id/endpoints/:name",
            axum::routing::delete(admin::remove_endpoint),
        )
        .route(
            "/providers/:id/endpoints/:name/activate",
            post(admin::activate_endpoint),
        )
        .route(
            "/providers/:id/endpoints/:name/deactivate",
            post(admin::deactivate_endpoint),
        )
        .route(
            "/providers/:id/templates",
            axum::routing::put(admin::update_templates),
        )
}
