use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::CategoryError;
use super::slug::{is_reserved_slug, normalize_slug, slugify};

pub const NAME_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;
pub const LONG_DESCRIPTION_MAX: usize = 2000;
pub const META_TITLE_MAX: usize = 60;
pub const META_DESCRIPTION_MAX: usize = 160;

/// A category document as stored.
///
/// `parent` is the source of truth for the hierarchy; `children`, `level`
/// and `path` are denormalized copies kept in step by the hierarchy manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub parent: Option<Uuid>,
    pub children: Vec<Uuid>,
    pub level: i32,
    pub path: Vec<Uuid>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Vec<String>,
    pub image: Option<String>,
    pub icon: Option<String>,
    pub category_design: Option<CategoryDesign>,
    pub is_active: bool,
    pub is_featured: bool,
    pub sort_order: i32,
    pub view_count: i64,
    pub product_count: i64,
    pub custom_fields: Option<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDesign {
    pub point_of_view: Option<String>,
    pub value_proposition: Option<String>,
    pub target_audience: Option<String>,
    pub competitive_advantage: Option<String>,
}

impl CategoryDesign {
    fn normalize(&mut self) -> Result<(), CategoryError> {
        trim_optional(&mut self.point_of_view, "categoryDesign.pointOfView", 500)?;
        trim_optional(&mut self.value_proposition, "categoryDesign.valueProposition", 300)?;
        trim_optional(&mut self.target_audience, "categoryDesign.targetAudience", 200)?;
        trim_optional(&mut self.competitive_advantage, "categoryDesign.competitiveAdvantage", 300)?;
        Ok(())
    }
}

/// Create payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub slug: Option<String>,
    pub parent: Option<Uuid>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub image: Option<String>,
    pub icon: Option<String>,
    pub category_design: Option<CategoryDesign>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub sort_order: Option<i32>,
    pub custom_fields: Option<Map<String, Value>>,
}

impl NewCategory {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn under(name: impl Into<String>, parent: Uuid) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent),
            ..Default::default()
        }
    }

    /// Trim and bound every field, and resolve the slug (explicit or derived).
    pub fn normalize(&mut self) -> Result<String, CategoryError> {
        self.name = normalize_name(&self.name)?;
        trim_optional(&mut self.description, "description", DESCRIPTION_MAX)?;
        trim_optional(&mut self.long_description, "longDescription", LONG_DESCRIPTION_MAX)?;
        trim_optional(&mut self.meta_title, "metaTitle", META_TITLE_MAX)?;
        trim_optional(&mut self.meta_description, "metaDescription", META_DESCRIPTION_MAX)?;
        normalize_keywords(&mut self.keywords);
        if let Some(design) = self.category_design.as_mut() {
            design.normalize()?;
        }

        let slug = match self.slug.as_deref() {
            Some(explicit) => normalize_slug(explicit)
                .ok_or_else(|| CategoryError::validation(format!("Invalid slug '{}'", explicit)))?,
            None => slugify(&self.name),
        };
        reject_reserved(&slug)?;
        Ok(slug)
    }
}

/// Partial update payload.
///
/// Hierarchy fields other than `parent` are not accepted at all; `parent`
/// is only read so the manager can refuse re-parenting explicitly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    /// `Some(None)` when the payload carries `"parent": null`.
    #[serde(default, deserialize_with = "present")]
    pub parent: Option<Option<Uuid>>,
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
    pub custom_fields: Option<Map<String, Value>>,
}

impl CategoryUpdate {
    pub fn normalize(&mut self) -> Result<(), CategoryError> {
        if let Some(name) = self.name.as_deref() {
            self.name = Some(normalize_name(name)?);
        }
        if let Some(slug) = self.slug.as_deref() {
            let normalized = normalize_slug(slug)
                .ok_or_else(|| CategoryError::validation(format!("Invalid slug '{}'", slug)))?;
            reject_reserved(&normalized)?;
            self.slug = Some(normalized);
        }
        trim_optional(&mut self.description, "description", DESCRIPTION_MAX)?;
        trim_optional(&mut self.long_description, "longDescription", LONG_DESCRIPTION_MAX)?;
        trim_optional(&mut self.meta_title, "metaTitle", META_TITLE_MAX)?;
        trim_optional(&mut self.meta_description, "metaDescription", META_DESCRIPTION_MAX)?;
        if let Some(keywords) = self.keywords.as_mut() {
            normalize_keywords(keywords);
        }
        if let Some(design) = self.category_design.as_mut() {
            design.normalize()?;
        }
        Ok(())
    }
}

/// One entry of a bulk update request.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkUpdateItem {
    pub id: Uuid,
    #[serde(flatten)]
    pub update: CategoryUpdate,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkUpdateError {
    pub id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkUpdateResult {
    pub updated: Vec<Category>,
    pub errors: Vec<BulkUpdateError>,
}

/// `{id, name, slug}` used when a reference is populated for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<&Category> for CategoryRef {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
        }
    }
}

/// Tree node: the category's own fields with `children` replaced by nested nodes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: CategoryNodeFields,
    pub children: Vec<CategoryNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_product_count: Option<u64>,
}

/// `Category` minus its `children` id list, so the node's nested list can take the name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNodeFields {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent: Option<Uuid>,
    pub level: i32,
    pub path: Vec<Uuid>,
    pub image: Option<String>,
    pub icon: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub sort_order: i32,
    pub view_count: i64,
    pub product_count: i64,
}

impl From<&Category> for CategoryNodeFields {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            slug: c.slug.clone(),
            description: c.description.clone(),
            parent: c.parent,
            level: c.level,
            path: c.path.clone(),
            image: c.image.clone(),
            icon: c.icon.clone(),
            is_active: c.is_active,
            is_featured: c.is_featured,
            sort_order: c.sort_order,
            view_count: c.view_count,
            product_count: c.product_count,
        }
    }
}

impl CategoryNode {
    pub fn id(&self) -> Uuid {
        self.category.id
    }

    /// Depth-first visit of this node and everything below it.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a CategoryNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Single-category read with populated references.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub parent_ref: Option<CategoryRef>,
    pub path_refs: Vec<CategoryRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_categories: Option<Vec<Category>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ProductSummary>>,
}

/// Listing row; `activeProductCount` only when requested.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListItem {
    #[serde(flatten)]
    pub category: Category,
    pub parent_ref: Option<CategoryRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_product_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total_products: u64,
    pub active_products: u64,
    pub average_price: Decimal,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAnalytics {
    pub category: AnalyticsSummary,
    pub hierarchy: HierarchyStats,
    pub products: ProductStats,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub level: i32,
    pub view_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyStats {
    pub parent: Option<Uuid>,
    pub descendants_count: usize,
    pub total_levels: i32,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

fn reject_reserved(slug: &str) -> Result<(), CategoryError> {
    if is_reserved_slug(slug) {
        return Err(CategoryError::validation(format!(
            "Slug '{}' is reserved; supply a different slug",
            slug
        )));
    }
    Ok(())
}

fn normalize_name(name: &str) -> Result<String, CategoryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CategoryError::validation("Category name is required"));
    }
    if trimmed.chars().count() > NAME_MAX {
        return Err(CategoryError::validation(format!(
            "Category name must be at most {} characters",
            NAME_MAX
        )));
    }
    if slugify(trimmed).is_empty() {
        return Err(CategoryError::validation(
            "Category name must contain at least one ASCII letter or digit",
        ));
    }
    Ok(trimmed.to_string())
}

fn trim_optional(value: &mut Option<String>, field: &str, max: usize) -> Result<(), CategoryError> {
    if let Some(v) = value.as_mut() {
        let trimmed = v.trim();
        if trimmed.chars().count() > max {
            return Err(CategoryError::validation(format!(
                "{} must be at most {} characters",
                field, max
            )));
        }
        *v = trimmed.to_string();
    }
    Ok(())
}

fn normalize_keywords(keywords: &mut Vec<String>) {
    keywords.iter_mut().for_each(|k| *k = k.trim().to_string());
    keywords.retain(|k| !k.is_empty());
}
