use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::filter::{
    CategoryFilter, FilterOrder, FindOptions, Pagination, ParentFilter, SortField, SortSpec,
};

use super::error::CategoryError;
use super::model::{
    AnalyticsSummary, BulkUpdateError, BulkUpdateItem, BulkUpdateResult, Category,
    CategoryAnalytics, CategoryDetail, CategoryListItem, CategoryNode, CategoryRef,
    CategoryUpdate, HierarchyStats, NewCategory,
};
use super::store::{CategoryPatch, CategoryStore, ProductRegistry, StoreError};
use super::tree::{build_forest, plan_repair, RepairReport, RepairedCategory};

pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 100;
pub const RECENT_PRODUCTS_LIMIT: i64 = 10;

/// Listing parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub parent: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub level: Option<i32>,
    /// Attach per-category active product counts.
    pub include_products: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryPage {
    pub items: Vec<CategoryListItem>,
    pub pagination: Pagination,
}

/// Owns category documents and keeps the denormalized hierarchy fields in
/// step with `parent` pointers.
///
/// Holds no state between calls beyond the injected store handles.
pub struct CategoryHierarchy {
    store: Arc<dyn CategoryStore>,
    products: Arc<dyn ProductRegistry>,
    default_limit: i64,
    max_limit: i64,
}

impl CategoryHierarchy {
    pub fn new(store: Arc<dyn CategoryStore>, products: Arc<dyn ProductRegistry>) -> Self {
        Self {
            store,
            products,
            default_limit: DEFAULT_LIST_LIMIT,
            max_limit: MAX_LIST_LIMIT,
        }
    }

    pub fn with_limits(mut self, default_limit: i64, max_limit: i64) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit;
        self
    }

    pub async fn health_check(&self) -> Result<(), CategoryError> {
        self.store.health_check().await.map_err(CategoryError::from)
    }

    async fn require(&self, id: Uuid) -> Result<Category, CategoryError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CategoryError::not_found(id))
    }

    /// Create a category, linking it into its parent's `children`.
    ///
    /// Checks run in order: payload validation, duplicate name, parent
    /// existence, duplicate slug. Nothing is written when any check fails.
    pub async fn create(&self, mut input: NewCategory) -> Result<Category, CategoryError> {
        let slug = input.normalize()?;

        if self.store.find_one(&CategoryFilter::by_name(&input.name)).await?.is_some() {
            return Err(CategoryError::DuplicateName(input.name));
        }

        let (level, path) = match input.parent {
            Some(parent_id) => {
                let parent = self
                    .store
                    .find_by_id(parent_id)
                    .await?
                    .ok_or(CategoryError::ParentNotFound(parent_id))?;
                let mut path = parent.path.clone();
                path.push(parent.id);
                (parent.level + 1, path)
            }
            None => (0, Vec::new()),
        };

        if self.store.find_one(&CategoryFilter::by_slug(&slug)).await?.is_some() {
            return Err(CategoryError::DuplicateSlug(slug));
        }

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: input.name,
            slug,
            description: input.description,
            long_description: input.long_description,
            parent: input.parent,
            children: Vec::new(),
            level,
            path,
            meta_title: input.meta_title,
            meta_description: input.meta_description,
            keywords: input.keywords,
            image: input.image,
            icon: input.icon,
            category_design: input.category_design,
            is_active: input.is_active.unwrap_or(true),
            is_featured: input.is_featured.unwrap_or(false),
            sort_order: input.sort_order.unwrap_or(0),
            view_count: 0,
            product_count: 0,
            custom_fields: input.custom_fields,
            created_at: now,
            updated_at: now,
        };

        let (name, slug) = (category.name.clone(), category.slug.clone());
        let created = self
            .store
            .insert_linked(category)
            .await
            .map_err(|e| CategoryError::from_write(e, &name, &slug))?;

        info!(
            "Created category '{}' ({}) at level {}",
            created.name, created.id, created.level
        );
        Ok(created)
    }

    /// Active categories as a forest, siblings ordered by `sortOrder`.
    ///
    /// A category whose parent is inactive is left out along with its
    /// subtree.
    pub async fn get_tree(&self) -> Result<Vec<CategoryNode>, CategoryError> {
        let active = self
            .store
            .find(&CategoryFilter::active(), &FindOptions::by_sort_order())
            .await?;
        Ok(build_forest(active))
    }

    /// `get_tree`, optionally with each node's active product count.
    pub async fn tree(&self, include_products: bool) -> Result<Vec<CategoryNode>, CategoryError> {
        let mut forest = self.get_tree().await?;
        if !include_products {
            return Ok(forest);
        }

        let mut ids = Vec::new();
        for root in &forest {
            root.walk(&mut |node| ids.push(node.id()));
        }
        let counts = try_join_all(ids.iter().map(|id| self.products.count_active_by_category(*id))).await?;
        let counts: HashMap<Uuid, u64> = ids.into_iter().zip(counts).collect();

        fn attach(node: &mut CategoryNode, counts: &HashMap<Uuid, u64>) {
            node.active_product_count = Some(counts.get(&node.id()).copied().unwrap_or(0));
            for child in node.children.iter_mut() {
                attach(child, counts);
            }
        }
        for root in forest.iter_mut() {
            attach(root, &counts);
        }
        Ok(forest)
    }

    /// Every category below `id`, breadth-first, excluding `id` itself.
    pub async fn get_descendants(&self, id: Uuid) -> Result<Vec<Category>, CategoryError> {
        self.require(id).await?;
        let (descendants, _) = self.collect_descendants(id).await?;
        Ok(descendants)
    }

    /// Batched breadth-first walk: one `find` per depth level.
    ///
    /// Returns the descendants and the number of levels below `root`.
    /// Bounded by a visited set and by the total category count, so a
    /// corrupted parent cycle cannot loop.
    async fn collect_descendants(&self, root: Uuid) -> Result<(Vec<Category>, i32), CategoryError> {
        let ceiling = self.store.count_documents(&CategoryFilter::all()).await? as usize;

        let mut visited = HashSet::from([root]);
        let mut frontier = vec![root];
        let mut descendants = Vec::new();
        let mut depth = 0;

        while !frontier.is_empty() {
            let batch = self
                .store
                .find(
                    &CategoryFilter::children_of_any(std::mem::take(&mut frontier)),
                    &FindOptions::by_sort_order(),
                )
                .await?;

            for child in batch {
                if !visited.insert(child.id) {
                    warn!("Category {} reached twice below {}; parent cycle?", child.id, root);
                    continue;
                }
                if descendants.len() >= ceiling {
                    warn!("Descendant walk below {} hit ceiling of {}", root, ceiling);
                    return Ok((descendants, depth));
                }
                frontier.push(child.id);
                descendants.push(child);
            }
            if !frontier.is_empty() {
                depth += 1;
            }
        }

        debug!("Collected {} descendants below {}", descendants.len(), root);
        Ok((descendants, depth))
    }

    /// Ancestors of `id`, root first, excluding `id` itself.
    pub async fn get_ancestors(&self, id: Uuid) -> Result<Vec<Category>, CategoryError> {
        let category = self.require(id).await?;
        let ceiling = self.store.count_documents(&CategoryFilter::all()).await? as usize;

        let mut seen = HashSet::from([category.id]);
        let mut ancestors = Vec::new();
        let mut cursor = category.parent;
        while let Some(parent_id) = cursor {
            if ancestors.len() >= ceiling || !seen.insert(parent_id) {
                warn!("Ancestor walk from {} stopped at {}: cycle", id, parent_id);
                break;
            }
            match self.store.find_by_id(parent_id).await? {
                Some(parent) => {
                    cursor = parent.parent;
                    ancestors.push(parent);
                }
                None => {
                    warn!("Ancestor walk from {} stopped: parent {} missing", id, parent_id);
                    break;
                }
            }
        }

        ancestors.reverse();
        Ok(ancestors)
    }

    /// Delete a leaf category that no product references.
    pub async fn delete(&self, id: Uuid) -> Result<Category, CategoryError> {
        let category = self.require(id).await?;

        let product_count = self.products.count_by_category(id).await?;
        if product_count > 0 {
            return Err(CategoryError::HasProducts(product_count));
        }

        let child_count = self.store.count_documents(&CategoryFilter::children_of(id)).await?;
        if child_count > 0 {
            return Err(CategoryError::HasChildren(child_count));
        }

        // Products attached after the count still trip the foreign key.
        match self.store.delete_by_id(id).await {
            Ok(true) => {}
            Ok(false) => return Err(CategoryError::not_found(id)),
            Err(StoreError::ForeignKeyViolation { constraint }) => {
                warn!("Delete of {} blocked by {}", id, constraint);
                let count = self.products.count_by_category(id).await?;
                return Err(CategoryError::HasProducts(count.max(1)));
            }
            Err(e) => return Err(e.into()),
        }

        // The delete is committed; a failed unlink leaves a dangling id that
        // repair removes.
        if let Some(parent) = category.parent {
            if let Err(e) = self.store.update_by_id(parent, CategoryPatch::pull_child(id)).await {
                error!("Deleted category {} but failed to unlink it from {}: {}", id, parent, e);
            }
        }

        info!("Deleted category '{}' ({})", category.name, id);
        Ok(category)
    }

    /// Single category by id or slug, counting the view.
    pub async fn get(
        &self,
        id_or_slug: &str,
        include_children: bool,
        include_products: bool,
    ) -> Result<CategoryDetail, CategoryError> {
        let found = match Uuid::parse_str(id_or_slug) {
            Ok(id) => self.store.find_by_id(id).await?,
            Err(_) => self.store.find_one(&CategoryFilter::by_slug(id_or_slug)).await?,
        };
        let category = found.ok_or_else(|| CategoryError::not_found(id_or_slug))?;

        let category = self
            .store
            .update_by_id(category.id, CategoryPatch::inc_view_count(1))
            .await?
            .unwrap_or(category);

        let parent_ref = match category.parent {
            Some(parent) => self.store.find_by_id(parent).await?.as_ref().map(CategoryRef::from),
            None => None,
        };
        let path_refs = self.refs_in_order(&category.path).await?;

        let child_categories = if include_children {
            let options = FindOptions::sorted(vec![
                SortSpec::asc(SortField::SortOrder),
                SortSpec::asc(SortField::Name),
            ]);
            let filter = CategoryFilter::children_of(category.id).only_active();
            Some(self.store.find(&filter, &options).await?)
        } else {
            None
        };

        let products = if include_products {
            Some(
                self.products
                    .recent_by_category(category.id, RECENT_PRODUCTS_LIMIT)
                    .await?,
            )
        } else {
            None
        };

        Ok(CategoryDetail {
            category,
            parent_ref,
            path_refs,
            child_categories,
            products,
        })
    }

    async fn refs_in_order(&self, ids: &[Uuid]) -> Result<Vec<CategoryRef>, CategoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = self
            .store
            .find(&CategoryFilter::by_ids(ids.to_vec()), &FindOptions::default())
            .await?;
        let by_id: HashMap<Uuid, &Category> = found.iter().map(|c| (c.id, c)).collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id).map(|c| CategoryRef::from(*c)))
            .collect())
    }

    /// Paginated, filtered listing.
    pub async fn list(&self, query: ListQuery) -> Result<CategoryPage, CategoryError> {
        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(self.default_limit);
        let sort = FilterOrder::from_query(query.sort.as_deref(), query.order.as_deref())?;
        let options = FindOptions::sorted(sort).paginate(page, limit, self.max_limit)?;

        let filter = CategoryFilter {
            parent: query.parent.as_deref().map(ParentFilter::parse).transpose()?,
            is_active: query.is_active,
            is_featured: query.is_featured,
            level: query.level,
            search: query.search.filter(|s| !s.trim().is_empty()),
            ..Default::default()
        };

        let categories = self.store.find(&filter, &options).await?;
        let total = self.store.count_documents(&filter).await?;

        let parent_ids: Vec<Uuid> = categories
            .iter()
            .filter_map(|c| c.parent)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let parents: HashMap<Uuid, CategoryRef> = if parent_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .find(&CategoryFilter::by_ids(parent_ids), &FindOptions::default())
                .await?
                .iter()
                .map(|c| (c.id, CategoryRef::from(c)))
                .collect()
        };

        let counts: Vec<Option<u64>> = if query.include_products.unwrap_or(false) {
            try_join_all(categories.iter().map(|c| self.products.count_active_by_category(c.id)))
                .await?
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None; categories.len()]
        };

        let items = categories
            .into_iter()
            .zip(counts)
            .map(|(category, active_product_count)| CategoryListItem {
                parent_ref: category.parent.and_then(|p| parents.get(&p).cloned()),
                category,
                active_product_count,
            })
            .collect();

        let limit = options.limit.unwrap_or(limit);
        Ok(CategoryPage {
            items,
            pagination: Pagination::new(page, limit, total),
        })
    }

    /// Partial update of presentation fields.
    ///
    /// A changed name or explicit slug is checked for duplicates against
    /// every other category. The slug is never re-derived from a new name.
    /// Moving the category to another parent is refused.
    pub async fn update(&self, id: Uuid, mut update: CategoryUpdate) -> Result<Category, CategoryError> {
        update.normalize()?;
        let existing = self.require(id).await?;

        if let Some(requested) = update.parent {
            if requested != existing.parent {
                return Err(CategoryError::ReparentUnsupported);
            }
        }

        if let Some(name) = update.name.as_deref() {
            if name != existing.name {
                let filter = CategoryFilter::by_name(name).excluding(id);
                if self.store.find_one(&filter).await?.is_some() {
                    return Err(CategoryError::DuplicateName(name.to_string()));
                }
            }
        }
        if let Some(slug) = update.slug.as_deref() {
            if slug != existing.slug {
                let filter = CategoryFilter::by_slug(slug).excluding(id);
                if self.store.find_one(&filter).await?.is_some() {
                    return Err(CategoryError::DuplicateSlug(slug.to_string()));
                }
            }
        }

        let name = update.name.clone().unwrap_or_else(|| existing.name.clone());
        let slug = update.slug.clone().unwrap_or_else(|| existing.slug.clone());
        let patch = presentation_patch(update);
        if patch.is_empty() {
            return Ok(existing);
        }

        let updated = self
            .store
            .update_by_id(id, patch)
            .await
            .map_err(|e| CategoryError::from_write(e, &name, &slug))?
            .ok_or_else(|| CategoryError::not_found(id))?;

        debug!("Updated category {}", id);
        Ok(updated)
    }

    /// Apply each update independently and report per-item failures.
    pub async fn bulk_update(&self, items: Vec<BulkUpdateItem>) -> Result<BulkUpdateResult, CategoryError> {
        if items.is_empty() {
            return Err(CategoryError::validation("Categories array is required"));
        }

        let mut updated = Vec::new();
        let mut errors = Vec::new();
        for item in items {
            match self.update(item.id, item.update).await {
                Ok(category) => updated.push(category),
                Err(e) => {
                    debug!("Bulk update of {} failed: {}", item.id, e);
                    errors.push(BulkUpdateError { id: item.id, error: e.to_string() });
                }
            }
        }

        info!("Bulk updated {} categories, {} failed", updated.len(), errors.len());
        Ok(BulkUpdateResult { updated, errors })
    }

    pub async fn analytics(&self, id: Uuid) -> Result<CategoryAnalytics, CategoryError> {
        let category = self.require(id).await?;
        let (descendants, depth) = self.collect_descendants(id).await?;

        let mut ids = Vec::with_capacity(descendants.len() + 1);
        ids.push(category.id);
        ids.extend(descendants.iter().map(|d| d.id));
        let products = self.products.stats(&ids).await?;

        let views = category.view_count + descendants.iter().map(|d| d.view_count).sum::<i64>();

        Ok(CategoryAnalytics {
            category: AnalyticsSummary {
                id: category.id,
                name: category.name,
                slug: category.slug,
                level: category.level,
                view_count: category.view_count,
            },
            hierarchy: HierarchyStats {
                parent: category.parent,
                descendants_count: descendants.len(),
                total_levels: depth + 1,
            },
            products,
            views,
        })
    }

    /// Recompute `children`, `level` and `path` from `parent` pointers and
    /// write back whatever drifted. Running it twice writes nothing the
    /// second time.
    pub async fn repair(&self, dry_run: bool) -> Result<RepairReport, CategoryError> {
        let all = self
            .store
            .find(
                &CategoryFilter::all(),
                &FindOptions::sorted(vec![SortSpec::asc(SortField::CreatedAt)]),
            )
            .await?;
        let plan = plan_repair(&all);

        for orphan in &plan.orphans {
            warn!("Category {} points at a missing parent", orphan);
        }
        for member in &plan.cycles {
            warn!("Category {} is part of a parent cycle", member);
        }

        if !dry_run {
            for fix in &plan.fixes {
                warn!("Repairing category {} ({}): {:?}", fix.name, fix.id, fix.fields);
                self.store
                    .update_by_id(fix.id, CategoryPatch::hierarchy(fix.hierarchy.clone()))
                    .await?;
            }
        }

        info!(
            "Hierarchy repair scanned {} categories: {} drifted, {} orphaned, {} in cycles (dry_run={})",
            all.len(),
            plan.fixes.len(),
            plan.orphans.len(),
            plan.cycles.len(),
            dry_run
        );

        Ok(RepairReport {
            dry_run,
            scanned: all.len(),
            fixed: plan.fixes.iter().map(RepairedCategory::from).collect(),
            orphans: plan.orphans,
            cycles: plan.cycles,
        })
    }
}

fn presentation_patch(update: CategoryUpdate) -> CategoryPatch {
    CategoryPatch {
        name: update.name,
        slug: update.slug,
        description: update.description,
        long_description: update.long_description,
        meta_title: update.meta_title,
        meta_description: update.meta_description,
        keywords: update.keywords,
        image: update.image,
        icon: update.icon,
        category_design: update.category_design,
        is_active: update.is_active,
        is_featured: update.is_featured,
        sort_order: update.sort_order,
        custom_fields: update.custom_fields,
        ..Default::default()
    }
}
