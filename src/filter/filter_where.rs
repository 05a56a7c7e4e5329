use sqlx::{Postgres, QueryBuilder};

use crate::catalog::model::Category;

use super::types::{CategoryFilter, ParentFilter};

pub struct FilterWhere;

impl FilterWhere {
    /// Append ` WHERE ...` for `filter` to a Postgres query, binding every value.
    pub fn push_sql(builder: &mut QueryBuilder<'_, Postgres>, filter: &CategoryFilter) {
        let mut first = true;

        if let Some(ids) = &filter.ids {
            conjunction(builder, &mut first);
            builder.push("\"id\" = ANY(").push_bind(ids.clone()).push(")");
        }
        if let Some(id) = filter.exclude_id {
            conjunction(builder, &mut first);
            builder.push("\"id\" <> ").push_bind(id);
        }
        if let Some(name) = &filter.name {
            conjunction(builder, &mut first);
            builder.push("\"name\" = ").push_bind(name.clone());
        }
        if let Some(slug) = &filter.slug {
            conjunction(builder, &mut first);
            builder.push("\"slug\" = ").push_bind(slug.clone());
        }
        match &filter.parent {
            Some(ParentFilter::Root) => {
                conjunction(builder, &mut first);
                builder.push("\"parent\" IS NULL");
            }
            Some(ParentFilter::Id(parent)) => {
                conjunction(builder, &mut first);
                builder.push("\"parent\" = ").push_bind(*parent);
            }
            Some(ParentFilter::AnyOf(parents)) => {
                conjunction(builder, &mut first);
                builder.push("\"parent\" = ANY(").push_bind(parents.clone()).push(")");
            }
            None => {}
        }
        if let Some(is_active) = filter.is_active {
            conjunction(builder, &mut first);
            builder.push("\"is_active\" = ").push_bind(is_active);
        }
        if let Some(is_featured) = filter.is_featured {
            conjunction(builder, &mut first);
            builder.push("\"is_featured\" = ").push_bind(is_featured);
        }
        if let Some(level) = filter.level {
            conjunction(builder, &mut first);
            builder.push("\"level\" = ").push_bind(level);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", escape_like(search));
            conjunction(builder, &mut first);
            builder
                .push("(\"name\" ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR \"description\" ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    /// In-memory evaluation with the same semantics as `push_sql`.
    pub fn matches(filter: &CategoryFilter, category: &Category) -> bool {
        if let Some(ids) = &filter.ids {
            if !ids.contains(&category.id) {
                return false;
            }
        }
        if filter.exclude_id == Some(category.id) {
            return false;
        }
        if let Some(name) = &filter.name {
            if &category.name != name {
                return false;
            }
        }
        if let Some(slug) = &filter.slug {
            if &category.slug != slug {
                return false;
            }
        }
        let parent_ok = match &filter.parent {
            Some(ParentFilter::Root) => category.parent.is_none(),
            Some(ParentFilter::Id(parent)) => category.parent == Some(*parent),
            Some(ParentFilter::AnyOf(parents)) => {
                category.parent.map_or(false, |p| parents.contains(&p))
            }
            None => true,
        };
        if !parent_ok {
            return false;
        }
        if filter.is_active.map_or(false, |v| v != category.is_active) {
            return false;
        }
        if filter.is_featured.map_or(false, |v| v != category.is_featured) {
            return false;
        }
        if filter.level.map_or(false, |v| v != category.level) {
            return false;
        }
        if let Some(search) = &filter.search {
            let needle = search.to_lowercase();
            let in_name = category.name.to_lowercase().contains(&needle);
            let in_description = category
                .description
                .as_deref()
                .map_or(false, |d| d.to_lowercase().contains(&needle));
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }
}

fn conjunction(builder: &mut QueryBuilder<'_, Postgres>, first: &mut bool) {
    builder.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
