use axum::{extract::State, http::Uri};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET / - service name, version and route summary
pub async fn root(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "endpoints": {
            "public": [
                "GET /api/v1/categories",
                "GET /api/v1/categories/tree",
                "GET /api/v1/categories/:id",
                "GET /api/v1/categories/:id/ancestors"
            ],
            "admin": [
                "POST /api/v1/categories",
                "PUT /api/v1/categories/:id",
                "DELETE /api/v1/categories/:id",
                "GET /api/v1/categories/:id/analytics",
                "GET /api/v1/categories/:id/descendants",
                "PUT /api/v1/categories/bulk/update",
                "POST /api/v1/categories/repair"
            ]
        }
    }))
}

/// GET /health - 503 while the category store is unreachable
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.hierarchy.health_check().await.map_err(|e| {
        tracing::warn!("Health check failed: {}", e);
        ApiError::service_unavailable("Category store unavailable")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Fallback for paths no route matches
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} not found", uri.path()))
}
