use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::catalog::model::{BulkUpdateItem, BulkUpdateResult, CategoryAnalytics};
use crate::catalog::{Category, CategoryUpdate, NewCategory, RepairReport};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    #[serde(default)]
    pub categories: Vec<BulkUpdateItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairQuery {
    pub dry_run: Option<bool>,
}

fn audit(state: &AppState, user: &AuthUser, action: &str, target: impl std::fmt::Display) {
    if state.audit_enabled() {
        info!(user = %user.id, action, target = %target, "audit");
    }
}

/// POST /api/v1/categories
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<Category> {
    let Json(input) = body?;
    let category = state.hierarchy.create(input).await?;

    audit(&state, &user, "category.create", category.id);
    Ok(ApiResponse::created(category))
}

/// PUT /api/v1/categories/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CategoryUpdate>, JsonRejection>,
) -> ApiResult<Category> {
    let Path(id) = path?;
    let Json(update) = body?;
    let category = state.hierarchy.update(id, update).await?;

    audit(&state, &user, "category.update", id);
    Ok(ApiResponse::success(category))
}

/// DELETE /api/v1/categories/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = path?;
    state.hierarchy.delete(id).await?;

    audit(&state, &user, "category.delete", id);
    Ok(ApiResponse::message_only("Category deleted successfully"))
}

/// GET /api/v1/categories/:id/analytics
pub async fn analytics(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<CategoryAnalytics> {
    let Path(id) = path?;
    Ok(ApiResponse::success(state.hierarchy.analytics(id).await?))
}

/// GET /api/v1/categories/:id/descendants
pub async fn descendants(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Vec<Category>> {
    let Path(id) = path?;
    Ok(ApiResponse::success(state.hierarchy.get_descendants(id).await?))
}

/// PUT /api/v1/categories/bulk/update
pub async fn bulk_update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<BulkUpdateRequest>, JsonRejection>,
) -> ApiResult<BulkUpdateResult> {
    let Json(request) = body?;
    let result = state.hierarchy.bulk_update(request.categories).await?;

    let mut message = format!("Updated {} categories", result.updated.len());
    if !result.errors.is_empty() {
        message.push_str(&format!(", {} failed", result.errors.len()));
    }

    audit(&state, &user, "category.bulk_update", &message);
    Ok(ApiResponse::success(result).with_message(message))
}

/// POST /api/v1/categories/repair?dryRun=true
pub async fn repair(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<RepairQuery>, QueryRejection>,
) -> ApiResult<RepairReport> {
    let Query(query) = query?;
    let dry_run = query.dry_run.unwrap_or(false);
    let report = state.hierarchy.repair(dry_run).await?;

    if !dry_run {
        audit(&state, &user, "category.repair", report.fixed.len());
    }
    Ok(ApiResponse::success(report))
}
