use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::query_builder::Separated;
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::catalog::model::{Category, CategoryDesign};
use crate::catalog::store::{CategoryPatch, CategoryStore, StoreResult};
use crate::filter::filter_where::FilterWhere;
use crate::filter::{CategoryFilter, FilterOrder, FindOptions};

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    long_description: Option<String>,
    parent: Option<Uuid>,
    children: Vec<Uuid>,
    level: i32,
    path: Vec<Uuid>,
    meta_title: Option<String>,
    meta_description: Option<String>,
    keywords: Vec<String>,
    image: Option<String>,
    icon: Option<String>,
    category_design: Option<Json<CategoryDesign>>,
    is_active: bool,
    is_featured: bool,
    sort_order: i32,
    view_count: i64,
    product_count: i64,
    custom_fields: Option<Json<Map<String, Value>>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            long_description: row.long_description,
            parent: row.parent,
            children: row.children,
            level: row.level,
            path: row.path,
            meta_title: row.meta_title,
            meta_description: row.meta_description,
            keywords: row.keywords,
            image: row.image,
            icon: row.icon,
            category_design: row.category_design.map(|j| j.0),
            is_active: row.is_active,
            is_featured: row.is_featured,
            sort_order: row.sort_order,
            view_count: row.view_count,
            product_count: row.product_count,
            custom_fields: row.custom_fields.map(|j| j.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const INSERT_SQL: &str = r#"
    INSERT INTO categories (
        id, name, slug, description, long_description, parent, children, level, path,
        meta_title, meta_description, keywords, image, icon, category_design,
        is_active, is_featured, sort_order, view_count, product_count, custom_fields,
        created_at, updated_at
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
        $16, $17, $18, $19, $20, $21, $22, $23
    )
    RETURNING *
"#;

// Appends without duplicating: removes any existing copy first.
const LINK_CHILD_SQL: &str = r#"
    UPDATE categories
    SET children = array_append(array_remove(children, $1), $1), updated_at = now()
    WHERE id = $2
"#;

/// Category documents in the `categories` table.
#[derive(Clone)]
pub struct PgCategoryStore {
    pool: PgPool,
}

impl PgCategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_row<'e, E>(executor: E, category: &Category) -> Result<CategoryRow, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, CategoryRow>(INSERT_SQL)
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(&category.long_description)
            .bind(category.parent)
            .bind(&category.children)
            .bind(category.level)
            .bind(&category.path)
            .bind(&category.meta_title)
            .bind(&category.meta_description)
            .bind(&category.keywords)
            .bind(&category.image)
            .bind(&category.icon)
            .bind(category.category_design.clone().map(Json))
            .bind(category.is_active)
            .bind(category.is_featured)
            .bind(category.sort_order)
            .bind(category.view_count)
            .bind(category.product_count)
            .bind(category.custom_fields.clone().map(Json))
            .bind(category.created_at)
            .bind(category.updated_at)
            .fetch_one(executor)
            .await
    }
}

/// `SET` list for a patch. Returns false when the patch changes nothing.
fn push_assignments(set: &mut Separated<'_, '_, Postgres, &'static str>, patch: &CategoryPatch) -> bool {
    let mut any = false;

    macro_rules! assign {
        ($($field:ident => $column:literal),* $(,)?) => {
            $(if let Some(v) = &patch.$field {
                set.push(concat!($column, " = ")).push_bind_unseparated(v.clone());
                any = true;
            })*
        };
    }
    assign!(
        name => "name",
        slug => "slug",
        description => "description",
        long_description => "long_description",
        meta_title => "meta_title",
        meta_description => "meta_description",
        keywords => "keywords",
        image => "image",
        icon => "icon",
        is_active => "is_active",
        is_featured => "is_featured",
        sort_order => "sort_order",
    );
    if let Some(design) = &patch.category_design {
        set.push("category_design = ").push_bind_unseparated(Json(design.clone()));
        any = true;
    }
    if let Some(fields) = &patch.custom_fields {
        set.push("custom_fields = ").push_bind_unseparated(Json(fields.clone()));
        any = true;
    }
    if let Some(h) = &patch.hierarchy {
        set.push("level = ").push_bind_unseparated(h.level);
        set.push("path = ").push_bind_unseparated(h.path.clone());
        any = true;
    }

    // children: optional replacement, then push, then pull
    if patch.hierarchy.is_some() || patch.push_child.is_some() || patch.pull_child.is_some() {
        set.push("children = ");
        if patch.pull_child.is_some() {
            set.push_unseparated("array_remove(");
        }
        if patch.push_child.is_some() {
            set.push_unseparated("array_append(array_remove(");
        }
        match &patch.hierarchy {
            Some(h) => {
                set.push_bind_unseparated(h.children.clone());
            }
            None => {
                set.push_unseparated("children");
            }
        }
        if let Some(child) = patch.push_child {
            set.push_unseparated(", ")
                .push_bind_unseparated(child)
                .push_unseparated("), ")
                .push_bind_unseparated(child)
                .push_unseparated(")");
        }
        if let Some(child) = patch.pull_child {
            set.push_unseparated(", ")
                .push_bind_unseparated(child)
                .push_unseparated(")");
        }
        any = true;
    }

    if let Some(by) = patch.inc_view_count {
        set.push("view_count = view_count + ").push_bind_unseparated(by);
        any = true;
    }
    if any {
        set.push("updated_at = now()");
    }
    any
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn find(&self, filter: &CategoryFilter, options: &FindOptions) -> StoreResult<Vec<Category>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM categories");
        FilterWhere::push_sql(&mut qb, filter);
        qb.push(" ").push(FilterOrder::generate(&options.sort));
        if let Some(limit) = options.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if let Some(skip) = options.skip {
            qb.push(" OFFSET ").push_bind(skip);
        }

        let rows = qb.build_query_as::<CategoryRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn find_one(&self, filter: &CategoryFilter) -> StoreResult<Option<Category>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM categories");
        FilterWhere::push_sql(&mut qb, filter);
        qb.push(" ").push(FilterOrder::generate(&[])).push(" LIMIT 1");

        let row = qb.build_query_as::<CategoryRow>().fetch_optional(&self.pool).await?;
        Ok(row.map(Category::from))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Category::from))
    }

    async fn insert(&self, category: Category) -> StoreResult<Category> {
        let row = Self::insert_row(&self.pool, &category).await?;
        Ok(row.into())
    }

    async fn update_by_id(&self, id: Uuid, patch: CategoryPatch) -> StoreResult<Option<Category>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE categories SET ");
        let changed = {
            let mut set = qb.separated(", ");
            push_assignments(&mut set, &patch)
        };
        if !changed {
            return self.find_by_id(id).await;
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        let row = qb.build_query_as::<CategoryRow>().fetch_optional(&self.pool).await?;
        Ok(row.map(Category::from))
    }

    async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_documents(&self, filter: &CategoryFilter) -> StoreResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories");
        FilterWhere::push_sql(&mut qb, filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    /// Insert and link in one transaction.
    async fn insert_linked(&self, category: Category) -> StoreResult<Category> {
        let mut tx = self.pool.begin().await?;
        let row = Self::insert_row(&mut *tx, &category).await?;
        if let Some(parent) = category.parent {
            sqlx::query(LINK_CHILD_SQL)
                .bind(row.id)
                .bind(parent)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(row.into())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
