use axum::extract::{
    rejection::{PathRejection, QueryRejection},
    Path, Query, State,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::catalog::model::{CategoryDetail, CategoryListItem};
use crate::catalog::{Category, CategoryNode, ListQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeQuery {
    pub include_products: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowQuery {
    pub include_children: Option<bool>,
    pub include_products: Option<bool>,
}

/// GET /api/v1/categories - paginated listing
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<CategoryListItem>> {
    let Query(query) = query?;
    let page = state.hierarchy.list(query).await?;
    Ok(ApiResponse::paginated(page.items, page.pagination))
}

/// GET /api/v1/categories/tree - nested forest of active categories
pub async fn tree(
    State(state): State<AppState>,
    query: Result<Query<TreeQuery>, QueryRejection>,
) -> ApiResult<Vec<CategoryNode>> {
    let Query(query) = query?;
    let forest = state
        .hierarchy
        .tree(query.include_products.unwrap_or(false))
        .await?;
    Ok(ApiResponse::success(forest))
}

/// GET /api/v1/categories/:id - by id or slug; counts a view
pub async fn show(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ShowQuery>, QueryRejection>,
) -> ApiResult<CategoryDetail> {
    let Path(id_or_slug) = path?;
    let Query(query) = query?;

    let detail = state
        .hierarchy
        .get(
            &id_or_slug,
            query.include_children.unwrap_or(false),
            query.include_products.unwrap_or(false),
        )
        .await?;
    Ok(ApiResponse::success(detail))
}

/// GET /api/v1/categories/:id/ancestors - root first
pub async fn ancestors(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Vec<Category>> {
    let Path(id) = path?;
    let ancestors = state.hierarchy.get_ancestors(id).await?;
    Ok(ApiResponse::success(ancestors))
}
