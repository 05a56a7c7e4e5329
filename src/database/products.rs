use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::catalog::model::{ProductStats, ProductSummary};
use crate::catalog::store::{ProductRegistry, StoreResult};

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct StatsRow {
    total_products: i64,
    active_products: i64,
    average_price: Decimal,
    total_value: Decimal,
}

/// Read-only view of the `products` table.
#[derive(Clone)]
pub struct PgProductRegistry {
    pool: PgPool,
}

impl PgProductRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRegistry for PgProductRegistry {
    async fn count_by_category(&self, category: Uuid) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category = $1")
            .bind(category)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_active_by_category(&self, category: Uuid) -> StoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category = $1 AND is_active")
                .bind(category)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn recent_by_category(&self, category: Uuid, limit: i64) -> StoreResult<Vec<ProductSummary>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, is_active, created_at FROM products \
             WHERE category = $1 AND is_active ORDER BY created_at DESC LIMIT $2",
        )
        .bind(category)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ProductSummary {
                id: r.id,
                name: r.name,
                price: r.price,
                is_active: r.is_active,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn stats(&self, categories: &[Uuid]) -> StoreResult<ProductStats> {
        if categories.is_empty() {
            return Ok(ProductStats::default());
        }
        let row = sqlx::query_as::<_, StatsRow>(
            "SELECT COUNT(*) AS total_products, \
                    COUNT(*) FILTER (WHERE is_active) AS active_products, \
                    COALESCE(AVG(price), 0) AS average_price, \
                    COALESCE(SUM(price), 0) AS total_value \
             FROM products WHERE category = ANY($1)",
        )
        .bind(categories)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProductStats {
            total_products: row.total_products as u64,
            active_products: row.active_products as u64,
            average_price: row.average_price.round_dp(2),
            total_value: row.total_value,
        })
    }
}
