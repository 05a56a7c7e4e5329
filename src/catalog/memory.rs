use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::filter::filter_where::FilterWhere;
use crate::filter::{CategoryFilter, FilterOrder, FindOptions};

use super::model::{Category, ProductStats, ProductSummary};
use super::store::{CategoryPatch, CategoryStore, ProductRegistry, StoreError, StoreResult};

/// Category store held in process memory.
///
/// Documents are kept in insertion order; `find` sorts stably on top of it.
#[derive(Default)]
pub struct MemoryCategoryStore {
    documents: RwLock<Vec<Category>>,
}

impl MemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(documents: &[Category], candidate: &Category) -> StoreResult<()> {
        let others = documents.iter().filter(|c| c.id != candidate.id);
        for other in others {
            if other.name == candidate.name {
                return Err(StoreError::UniqueViolation { field: "name".to_string() });
            }
            if other.slug == candidate.slug {
                return Err(StoreError::UniqueViolation { field: "slug".to_string() });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn find(&self, filter: &CategoryFilter, options: &FindOptions) -> StoreResult<Vec<Category>> {
        let documents = self.documents.read().await;
        let mut found: Vec<Category> = documents
            .iter()
            .filter(|c| FilterWhere::matches(filter, c))
            .cloned()
            .collect();
        found.sort_by(|a, b| FilterOrder::compare(&options.sort, a, b));

        let skip = options.skip.unwrap_or(0).max(0) as usize;
        let iter = found.into_iter().skip(skip);
        Ok(match options.limit {
            Some(limit) => iter.take(limit.max(0) as usize).collect(),
            None => iter.collect(),
        })
    }

    async fn find_one(&self, filter: &CategoryFilter) -> StoreResult<Option<Category>> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|c| FilterWhere::matches(filter, c)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&self, category: Category) -> StoreResult<Category> {
        let mut documents = self.documents.write().await;
        if documents.iter().any(|c| c.id == category.id) {
            return Err(StoreError::UniqueViolation { field: "id".to_string() });
        }
        Self::check_unique(&documents, &category)?;
        documents.push(category.clone());
        Ok(category)
    }

    async fn update_by_id(&self, id: Uuid, patch: CategoryPatch) -> StoreResult<Option<Category>> {
        let mut documents = self.documents.write().await;
        let Some(index) = documents.iter().position(|c| c.id == id) else {
            return Ok(None);
        };

        let mut updated = documents[index].clone();
        patch.apply_to(&mut updated);
        Self::check_unique(&documents, &updated)?;
        documents[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool> {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|c| c.id != id);
        Ok(documents.len() != before)
    }

    async fn count_documents(&self, filter: &CategoryFilter) -> StoreResult<u64> {
        let documents = self.documents.read().await;
        Ok(documents.iter().filter(|c| FilterWhere::matches(filter, c)).count() as u64)
    }
}

/// Product row as the in-memory registry sees it.
#[derive(Debug, Clone)]
pub struct MemoryProduct {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub category: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl MemoryProduct {
    pub fn new(name: impl Into<String>, price: Decimal, category: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            price,
            category,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

#[derive(Default)]
pub struct MemoryProductRegistry {
    products: RwLock<Vec<MemoryProduct>>,
}

impl MemoryProductRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, product: MemoryProduct) -> Uuid {
        let id = product.id;
        self.products.write().await.push(product);
        id
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| p.id != id);
        products.len() != before
    }
}

#[async_trait]
impl ProductRegistry for MemoryProductRegistry {
    async fn count_by_category(&self, category: Uuid) -> StoreResult<u64> {
        let products = self.products.read().await;
        Ok(products.iter().filter(|p| p.category == category).count() as u64)
    }

    async fn count_active_by_category(&self, category: Uuid) -> StoreResult<u64> {
        let products = self.products.read().await;
        Ok(products
            .iter()
            .filter(|p| p.category == category && p.is_active)
            .count() as u64)
    }

    async fn recent_by_category(&self, category: Uuid, limit: i64) -> StoreResult<Vec<ProductSummary>> {
        let products = self.products.read().await;
        let mut matching: Vec<&MemoryProduct> = products
            .iter()
            .filter(|p| p.category == category && p.is_active)
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|p| ProductSummary {
                id: p.id,
                name: p.name.clone(),
                price: p.price,
                is_active: p.is_active,
                created_at: p.created_at,
            })
            .collect())
    }

    async fn stats(&self, categories: &[Uuid]) -> StoreResult<ProductStats> {
        let products = self.products.read().await;
        let matching: Vec<&MemoryProduct> = products
            .iter()
            .filter(|p| categories.contains(&p.category))
            .collect();
        if matching.is_empty() {
            return Ok(ProductStats::default());
        }

        let total_value: Decimal = matching.iter().map(|p| p.price).sum();
        let total = matching.len() as u64;
        Ok(ProductStats {
            total_products: total,
            active_products: matching.iter().filter(|p| p.is_active).count() as u64,
            average_price: (total_value / Decimal::from(total)).round_dp(2),
            total_value,
        })
    }
}
