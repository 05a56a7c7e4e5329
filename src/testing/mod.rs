use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::catalog::memory::{MemoryCategoryStore, MemoryProductRegistry};
use crate::catalog::model::Category;
use crate::catalog::slug::slugify;
use crate::catalog::CategoryHierarchy;

/// A consistent, active category document hanging under `parent`.
///
/// The parent's `children` list is not touched; link it yourself when the
/// test needs a fully consistent pair.
pub fn category(name: &str, parent: Option<&Category>) -> Category {
    let now = Utc::now();
    let (level, path) = match parent {
        Some(p) => {
            let mut path = p.path.clone();
            path.push(p.id);
            (p.level + 1, path)
        }
        None => (0, Vec::new()),
    };

    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: slugify(name),
        description: None,
        long_description: None,
        parent: parent.map(|p| p.id),
        children: Vec::new(),
        level,
        path,
        meta_title: None,
        meta_description: None,
        keywords: Vec::new(),
        image: None,
        icon: None,
        category_design: None,
        is_active: true,
        is_featured: false,
        sort_order: 0,
        view_count: 0,
        product_count: 0,
        custom_fields: None,
        created_at: now,
        updated_at: now,
    }
}

/// Hierarchy manager over fresh in-memory stores, with handles to both.
pub struct TestCatalog {
    pub hierarchy: CategoryHierarchy,
    pub store: Arc<MemoryCategoryStore>,
    pub products: Arc<MemoryProductRegistry>,
}

impl TestCatalog {
    pub fn new() -> Self {
        let store = Arc::new(MemoryCategoryStore::new());
        let products = Arc::new(MemoryProductRegistry::new());
        let hierarchy = CategoryHierarchy::new(store.clone(), products.clone());
        Self { hierarchy, store, products }
    }
}
