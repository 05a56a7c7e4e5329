use serde_json::json;

use crate::catalog::model::CategoryNode;
use crate::catalog::slug::{is_valid_slug, slugify};
use crate::cli::utils::{load_config, output_success};
use crate::cli::OutputFormat;
use crate::state::build_hierarchy;

pub async fn tree(include_products: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config()?;
    let (hierarchy, db) = build_hierarchy(config).await?;
    let forest = hierarchy.tree(include_products).await;
    if let Some(db) = db {
        db.close().await;
    }
    let forest = forest?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&forest)?),
        OutputFormat::Text => {
            if forest.is_empty() {
                println!("No active categories");
            }
            for root in &forest {
                print_node(root, 0);
            }
        }
    }
    Ok(())
}

fn print_node(node: &CategoryNode, depth: usize) {
    let products = node
        .active_product_count
        .map(|n| format!(" [{} products]", n))
        .unwrap_or_default();
    println!("{}{} ({}){}", "  ".repeat(depth), node.category.name, node.category.slug, products);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

pub async fn repair(dry_run: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config()?;
    let (hierarchy, db) = build_hierarchy(config).await?;
    let report = hierarchy.repair(dry_run).await;
    if let Some(db) = db {
        db.close().await;
    }
    let report = report?;

    let verb = if dry_run { "would fix" } else { "fixed" };
    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            &format!("Scanned {} categories", report.scanned),
            Some(serde_json::to_value(&report)?),
        ),
        OutputFormat::Text => {
            println!(
                "Scanned {} categories, {} {}",
                report.scanned,
                verb,
                report.fixed.len()
            );
            for fixed in &report.fixed {
                println!("  {} ({}): {}", fixed.name, fixed.id, fixed.fields.join(", "));
            }
            for orphan in &report.orphans {
                println!("  orphan: {}", orphan);
            }
            for member in &report.cycles {
                println!("  cycle: {}", member);
            }
            Ok(())
        }
    }
}

pub fn slug(name: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let slug = slugify(name);
    if !is_valid_slug(&slug) {
        anyhow::bail!("'{}' does not produce a usable slug", name);
    }

    output_success(output_format, &slug, Some(json!({ "name": name, "slug": slug })))
}
