use thiserror::Error;
use uuid::Uuid;

use crate::filter::FilterError;

use super::store::StoreError;

/// Failures surfaced by the hierarchy manager.
///
/// Only `StoreUnavailable` is worth retrying; every other kind is permanent
/// for the given input.
#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Category with name '{0}' already exists")]
    DuplicateName(String),

    #[error("Category with slug '{0}' already exists")]
    DuplicateSlug(String),

    #[error("Parent category {0} not found")]
    ParentNotFound(Uuid),

    #[error("Category {0} not found")]
    CategoryNotFound(String),

    #[error("Cannot delete category with {0} products. Please reassign or delete products first.")]
    HasProducts(u64),

    #[error("Cannot delete category with {0} subcategories. Please delete or reassign subcategories first.")]
    HasChildren(u64),

    #[error("Changing the parent of an existing category is not supported")]
    ReparentUnsupported,

    #[error("{0}")]
    Validation(String),

    #[error("Category store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Category store rejected the operation: {0}")]
    Internal(String),
}

impl CategoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        CategoryError::Validation(message.into())
    }

    pub fn not_found(id: impl ToString) -> Self {
        CategoryError::CategoryNotFound(id.to_string())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CategoryError::StoreUnavailable(_))
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            CategoryError::DuplicateName(_) => "DUPLICATE_NAME",
            CategoryError::DuplicateSlug(_) => "DUPLICATE_SLUG",
            CategoryError::ParentNotFound(_) => "PARENT_NOT_FOUND",
            CategoryError::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            CategoryError::HasProducts(_) => "HAS_PRODUCTS",
            CategoryError::HasChildren(_) => "HAS_CHILDREN",
            CategoryError::ReparentUnsupported => "REPARENT_UNSUPPORTED",
            CategoryError::Validation(_) => "VALIDATION_ERROR",
            CategoryError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            CategoryError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Map a write-time store failure, turning unique-index violations into
    /// the same duplicate errors the pre-write checks produce.
    pub(crate) fn from_write(err: StoreError, name: &str, slug: &str) -> Self {
        match err {
            StoreError::UniqueViolation { field } if field == "name" => {
                CategoryError::DuplicateName(name.to_string())
            }
            StoreError::UniqueViolation { field } if field == "slug" => {
                CategoryError::DuplicateSlug(slug.to_string())
            }
            other => other.into(),
        }
    }
}

impl From<FilterError> for CategoryError {
    fn from(err: FilterError) -> Self {
        CategoryError::Validation(err.to_string())
    }
}

impl From<StoreError> for CategoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => CategoryError::StoreUnavailable(msg),
            StoreError::UniqueViolation { field } => {
                CategoryError::Validation(format!("Duplicate value for unique field '{}'", field))
            }
            StoreError::ForeignKeyViolation { constraint } => {
                CategoryError::Internal(format!("constraint '{}' still referenced", constraint))
            }
            StoreError::Query(msg) => CategoryError::Internal(msg),
        }
    }
}
