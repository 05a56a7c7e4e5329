use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{CategoryFilter, FindOptions};

use super::model::{Category, CategoryDesign, ProductStats, ProductSummary};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unique constraint violated on '{field}'")]
    UniqueViolation { field: String },

    /// A row is still referenced through `constraint`.
    #[error("foreign key '{constraint}' still referenced")]
    ForeignKeyViolation { constraint: String },

    #[error("query failed: {0}")]
    Query(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Document-style update applied atomically to one category.
///
/// The `set_*` fields replace values; `push_child` / `pull_child` add or
/// remove one id in `children` (set semantics); `inc_view_count` adds to
/// the counter. `updated_at` is refreshed whenever any field changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub image: Option<String>,
    pub icon: Option<String>,
    pub category_design: Option<CategoryDesign>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub sort_order: Option<i32>,
    pub custom_fields: Option<serde_json::Map<String, serde_json::Value>>,
    pub hierarchy: Option<HierarchyFields>,
    pub push_child: Option<Uuid>,
    pub pull_child: Option<Uuid>,
    pub inc_view_count: Option<i64>,
}

/// Denormalized hierarchy columns, rewritten only by the repair pass.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyFields {
    pub children: Vec<Uuid>,
    pub level: i32,
    pub path: Vec<Uuid>,
}

impl CategoryPatch {
    pub fn push_child(child: Uuid) -> Self {
        Self { push_child: Some(child), ..Default::default() }
    }

    pub fn pull_child(child: Uuid) -> Self {
        Self { pull_child: Some(child), ..Default::default() }
    }

    pub fn inc_view_count(by: i64) -> Self {
        Self { inc_view_count: Some(by), ..Default::default() }
    }

    pub fn hierarchy(fields: HierarchyFields) -> Self {
        Self { hierarchy: Some(fields), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to an in-memory document.
    pub fn apply_to(&self, category: &mut Category) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(v) = &self.$field { category.$field = v.clone(); })*
            };
        }
        macro_rules! set_opt {
            ($($field:ident),*) => {
                $(if let Some(v) = &self.$field { category.$field = Some(v.clone()); })*
            };
        }

        set!(name, slug, keywords, is_active, is_featured, sort_order);
        set_opt!(
            description,
            long_description,
            meta_title,
            meta_description,
            image,
            icon,
            category_design,
            custom_fields
        );

        if let Some(h) = &self.hierarchy {
            category.children = h.children.clone();
            category.level = h.level;
            category.path = h.path.clone();
        }
        if let Some(child) = self.push_child {
            if !category.children.contains(&child) {
                category.children.push(child);
            }
        }
        if let Some(child) = self.pull_child {
            category.children.retain(|c| *c != child);
        }
        if let Some(by) = self.inc_view_count {
            category.view_count += by;
        }
        if !self.is_empty() {
            category.updated_at = chrono::Utc::now();
        }
    }
}

/// Persistence for category documents.
///
/// Implementations must enforce uniqueness of `name` and `slug`, reporting
/// violations as `StoreError::UniqueViolation` with the field name.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn find(&self, filter: &CategoryFilter, options: &FindOptions) -> StoreResult<Vec<Category>>;

    async fn find_one(&self, filter: &CategoryFilter) -> StoreResult<Option<Category>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Category>>;

    async fn insert(&self, category: Category) -> StoreResult<Category>;

    /// `None` when no document has this id.
    async fn update_by_id(&self, id: Uuid, patch: CategoryPatch) -> StoreResult<Option<Category>>;

    /// `false` when no document has this id.
    async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool>;

    async fn count_documents(&self, filter: &CategoryFilter) -> StoreResult<u64>;

    /// Insert a category and add it to its parent's `children`.
    ///
    /// The default performs two separate writes. A crash between them leaves
    /// the child missing from the parent's list until a repair pass runs.
    /// Stores with transactions should override this.
    async fn insert_linked(&self, category: Category) -> StoreResult<Category> {
        let parent = category.parent;
        let inserted = self.insert(category).await?;
        if let Some(parent) = parent {
            self.update_by_id(parent, CategoryPatch::push_child(inserted.id)).await?;
        }
        Ok(inserted)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.count_documents(&CategoryFilter::all()).await.map(|_| ())
    }
}

/// Read-only view of products owned by the product service.
#[async_trait]
pub trait ProductRegistry: Send + Sync {
    /// Every product in the category, active or not.
    async fn count_by_category(&self, category: Uuid) -> StoreResult<u64>;

    async fn count_active_by_category(&self, category: Uuid) -> StoreResult<u64>;

    /// Most recent active products, newest first.
    async fn recent_by_category(&self, category: Uuid, limit: i64) -> StoreResult<Vec<ProductSummary>>;

    async fn stats(&self, categories: &[Uuid]) -> StoreResult<ProductStats>;
}
