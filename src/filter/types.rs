use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::FilterError;

/// Which categories a `find` / `count_documents` call selects.
///
/// Every populated field must match (logical AND). An empty filter selects
/// every category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryFilter {
    pub ids: Option<Vec<Uuid>>,
    pub exclude_id: Option<Uuid>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub parent: Option<ParentFilter>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub level: Option<i32>,
    /// Case-insensitive substring match against name or description
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParentFilter {
    Root,
    Id(Uuid),
    AnyOf(Vec<Uuid>),
}

impl ParentFilter {
    /// Query-string form: `null` selects roots, anything else must be an id.
    pub fn parse(value: &str) -> Result<Self, FilterError> {
        let value = value.trim();
        if value == "null" {
            return Ok(ParentFilter::Root);
        }
        Uuid::parse_str(value)
            .map(ParentFilter::Id)
            .map_err(|_| FilterError::InvalidValue {
                field: "parent".to_string(),
                value: value.to_string(),
            })
    }
}

impl CategoryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Default::default() }
    }

    pub fn by_slug(slug: impl Into<String>) -> Self {
        Self { slug: Some(slug.into()), ..Default::default() }
    }

    pub fn by_ids(ids: Vec<Uuid>) -> Self {
        Self { ids: Some(ids), ..Default::default() }
    }

    pub fn children_of(parent: Uuid) -> Self {
        Self { parent: Some(ParentFilter::Id(parent)), ..Default::default() }
    }

    pub fn children_of_any(parents: Vec<Uuid>) -> Self {
        Self { parent: Some(ParentFilter::AnyOf(parents)), ..Default::default() }
    }

    pub fn active() -> Self {
        Self { is_active: Some(true), ..Default::default() }
    }

    pub fn excluding(mut self, id: Uuid) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn only_active(mut self) -> Self {
        self.is_active = Some(true);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    Name,
    Slug,
    SortOrder,
    Level,
    CreatedAt,
    UpdatedAt,
    ViewCount,
    ProductCount,
}

impl SortField {
    /// Accepts the camelCase document name or the snake_case column name.
    pub fn parse(field: &str) -> Result<Self, FilterError> {
        match field.trim() {
            "name" => Ok(SortField::Name),
            "slug" => Ok(SortField::Slug),
            "sortOrder" | "sort_order" => Ok(SortField::SortOrder),
            "level" => Ok(SortField::Level),
            "createdAt" | "created_at" => Ok(SortField::CreatedAt),
            "updatedAt" | "updated_at" => Ok(SortField::UpdatedAt),
            "viewCount" | "view_count" => Ok(SortField::ViewCount),
            "productCount" | "product_count" => Ok(SortField::ProductCount),
            other => Err(FilterError::InvalidSortField(other.to_string())),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Slug => "slug",
            SortField::SortOrder => "sort_order",
            SortField::Level => "level",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::ViewCount => "view_count",
            SortField::ProductCount => "product_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(direction: &str) -> Result<Self, FilterError> {
        match direction.trim().to_ascii_lowercase().as_str() {
            "" | "asc" | "1" => Ok(SortDirection::Asc),
            "desc" | "-1" => Ok(SortDirection::Desc),
            other => Err(FilterError::InvalidSortDirection(other.to_string())),
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: SortField) -> Self {
        Self { field, direction: SortDirection::Asc }
    }

    pub fn desc(field: SortField) -> Self {
        Self { field, direction: SortDirection::Desc }
    }
}

/// Ordering and window for `find`.
///
/// Results are always tie-broken by `created_at`, so equal sort keys come
/// back in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<SortSpec>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn sorted(sort: Vec<SortSpec>) -> Self {
        Self { sort, ..Default::default() }
    }

    pub fn by_sort_order() -> Self {
        Self::sorted(vec![SortSpec::asc(SortField::SortOrder)])
    }

    /// 1-based page window, with the limit capped at `max_limit`.
    pub fn paginate(mut self, page: i64, limit: i64, max_limit: i64) -> Result<Self, FilterError> {
        if page < 1 {
            return Err(FilterError::InvalidPage("Page must be at least 1".to_string()));
        }
        if limit < 1 {
            return Err(FilterError::InvalidLimit("Limit must be at least 1".to_string()));
        }
        let limit = if limit > max_limit {
            tracing::debug!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };
        let skip = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| FilterError::InvalidPage(format!("Page {} is out of range", page)))?;
        self.skip = Some(skip);
        self.limit = Some(limit);
        Ok(self)
    }
}

/// Page metadata returned alongside a listing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: u64) -> Self {
        let per_page = limit.max(1) as u64;
        Self {
            page,
            limit,
            total,
            pages: (total + per_page - 1) / per_page,
        }
    }
}
