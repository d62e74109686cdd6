//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the webhook endpoints, operational readouts, and OpenAPI
//! documentation.

use crate::{
    handlers,
    models::{ErrorResponse, HealthResponse, StatusResponse, WebhookAck},
    state::AppState,
};

use axum::{
    Router,
    routing::get,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::verify_webhook,
        handlers::receive_webhook,
        handlers::health,
        handlers::status_report,
    ),
    components(
        schemas(WebhookAck, HealthResponse, StatusResponse, ErrorResponse)
    ),
    tags(
        (name = "Chatrelay API", description = "WhatsApp webhook relay for the Gemini chat backend")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route(
            "/webhook",
            get(handlers::verify_webhook).post(handlers::receive_webhook),
        )
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status_report))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Create the final router that merges the stateful routes
    // with the stateless routes (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
