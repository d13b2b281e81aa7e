//! Health check and welcome endpoints

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current status of the service
    pub status: String,
    /// Version of the service
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// API root, useful to check an API key
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "API is reachable", body = WelcomeResponse),
        (status = 403, description = "Invalid API key")
    )
)]
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Biblio library catalog API".to_string(),
    })
}
