use std::cmp::Ordering;

use crate::catalog::model::Category;

use super::error::FilterError;
use super::types::{SortDirection, SortField, SortSpec};

pub struct FilterOrder;

impl FilterOrder {
    /// Query-string form: `sort=<field>&order=asc|desc`. A `sort` value in
    /// comma form is parsed with `parse` and `order` is ignored.
    pub fn from_query(sort: Option<&str>, order: Option<&str>) -> Result<Vec<SortSpec>, FilterError> {
        if let Some(spec) = sort.filter(|s| s.contains(',') || s.trim().contains(' ')) {
            return Self::parse(spec);
        }
        let field = SortField::parse(sort.unwrap_or("name"))?;
        let direction = SortDirection::parse(order.unwrap_or("asc"))?;
        Ok(vec![SortSpec { field, direction }])
    }

    /// Comma form: `"sortOrder asc, name desc"`. Missing direction means asc.
    pub fn parse(spec: &str) -> Result<Vec<SortSpec>, FilterError> {
        let mut out = Vec::new();
        for part in spec.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let field = SortField::parse(col)?;
                let direction = SortDirection::parse(it.next().unwrap_or("asc"))?;
                out.push(SortSpec { field, direction });
            }
        }
        Ok(out)
    }

    /// `ORDER BY` clause including the stable tie-breakers.
    pub fn generate(specs: &[SortSpec]) -> String {
        let mut parts: Vec<String> = specs
            .iter()
            .map(|s| format!("\"{}\" {}", s.field.column(), s.direction.to_sql()))
            .collect();
        parts.push("\"created_at\" ASC".to_string());
        parts.push("\"id\" ASC".to_string());
        format!("ORDER BY {}", parts.join(", "))
    }

    /// In-memory equivalent of `generate`. Used with a stable sort over
    /// insertion order, so `id` is not needed as a final tie-breaker.
    pub fn compare(specs: &[SortSpec], a: &Category, b: &Category) -> Ordering {
        for spec in specs {
            let ord = match spec.field {
                SortField::Name => a.name.cmp(&b.name),
                SortField::Slug => a.slug.cmp(&b.slug),
                SortField::SortOrder => a.sort_order.cmp(&b.sort_order),
                SortField::Level => a.level.cmp(&b.level),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::ViewCount => a.view_count.cmp(&b.view_count),
                SortField::ProductCount => a.product_count.cmp(&b.product_count),
            };
            let ord = match spec.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.created_at.cmp(&b.created_at)
    }
}
