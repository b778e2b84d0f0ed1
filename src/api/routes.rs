//! Router configuration for the API.
//!
//! Centralized route registration and middleware configuration.

use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::doc::ApiDoc;
use crate::api::handlers;
use crate::api::middleware::{auth_middleware, logging_middleware, request_id_middleware};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// # Middleware Order
/// Middleware is applied in reverse order of declaration (last added runs
/// first): request IDs are assigned before logging, and authentication
/// guards only the `/api` surface. Health checks and the Swagger UI stay
/// public.
pub fn create_router(state: AppState) -> Router {
    let protected_api = OpenApiRouter::new()
        .nest("/api/campaigns", handlers::campaigns::campaign_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let (api_router, api_doc) =
        OpenApiRouter::with_openapi(ApiDoc::openapi())
            .merge(protected_api)
            .split_for_parts();

    Router::new()
        .merge(api_router)
        .merge(handlers::health::health_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc))
        // Middleware is applied in reverse order - last added runs first
        // so logging sees the request ID set by request_id_middleware
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
