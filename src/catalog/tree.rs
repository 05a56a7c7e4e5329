use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use super::model::{Category, CategoryNode, CategoryNodeFields};
use super::store::HierarchyFields;

/// Assemble a forest from a flat, already-ordered list of categories.
///
/// Each category is attached under its parent when the parent is in the
/// list. Roots start the forest. A category whose parent is absent from the
/// list (for example an inactive parent) is dropped together with its whole
/// subtree; it is neither promoted to a root nor re-attached higher up.
/// Sibling order follows input order.
pub fn build_forest(categories: Vec<Category>) -> Vec<CategoryNode> {
    let index: HashMap<Uuid, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id, i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); categories.len()];
    let mut roots = Vec::new();
    for (i, category) in categories.iter().enumerate() {
        match category.parent {
            None => roots.push(i),
            Some(parent) => match index.get(&parent) {
                Some(&p) => children[p].push(i),
                None => tracing::debug!(
                    "Dropping category {} from tree: parent {} not in active set",
                    category.id,
                    parent
                ),
            },
        }
    }

    // Only nodes reachable from a root are materialized, so a parent cycle
    // cannot recurse forever.
    fn materialize(at: usize, categories: &[Category], children: &[Vec<usize>]) -> CategoryNode {
        CategoryNode {
            category: CategoryNodeFields::from(&categories[at]),
            children: children[at]
                .iter()
                .map(|&c| materialize(c, categories, children))
                .collect(),
            active_product_count: None,
        }
    }

    roots
        .into_iter()
        .map(|r| materialize(r, &categories, &children))
        .collect()
}

/// Hierarchy drift found by `plan_repair`.
#[derive(Debug, Clone, Default)]
pub struct RepairPlan {
    pub fixes: Vec<RepairFix>,
    /// Categories whose `parent` points at a missing document.
    pub orphans: Vec<Uuid>,
    /// Categories that are their own ancestor.
    pub cycles: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct RepairFix {
    pub id: Uuid,
    pub name: String,
    pub fields: Vec<&'static str>,
    pub hierarchy: HierarchyFields,
}

/// Serializable outcome of a repair run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub dry_run: bool,
    pub scanned: usize,
    pub fixed: Vec<RepairedCategory>,
    pub orphans: Vec<Uuid>,
    pub cycles: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairedCategory {
    pub id: Uuid,
    pub name: String,
    pub fields: Vec<&'static str>,
}

impl From<&RepairFix> for RepairedCategory {
    fn from(fix: &RepairFix) -> Self {
        Self {
            id: fix.id,
            name: fix.name.clone(),
            fields: fix.fields.clone(),
        }
    }
}

/// Recompute `children`, `level` and `path` from `parent` pointers.
///
/// `children` is rebuilt for every category, keeping the existing order of
/// ids that remain valid and appending missing ones in input order.
/// `level` and `path` are only recomputed for categories with an unbroken
/// chain to a root; orphans, cycle members and everything below them keep
/// their stored values and are reported instead.
pub fn plan_repair(categories: &[Category]) -> RepairPlan {
    let by_id: HashMap<Uuid, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    let mut expected_children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    let mut orphans = Vec::new();
    for category in categories {
        if let Some(parent) = category.parent {
            if by_id.contains_key(&parent) {
                expected_children.entry(parent).or_default().push(category.id);
            } else {
                orphans.push(category.id);
            }
        }
    }

    let mut lineage: HashMap<Uuid, Option<Vec<Uuid>>> = HashMap::new();
    let mut cycles = HashSet::new();
    for category in categories {
        resolve_lineage(category.id, &by_id, &mut lineage, &mut cycles);
    }

    let mut fixes = Vec::new();
    for category in categories {
        let wanted = expected_children.remove(&category.id).unwrap_or_default();
        let children = reconcile_children(&category.children, &wanted);

        let (level, path) = match lineage.get(&category.id) {
            Some(Some(path)) => (path.len() as i32, path.clone()),
            _ => (category.level, category.path.clone()),
        };

        let mut fields = Vec::new();
        if children != category.children {
            fields.push("children");
        }
        if level != category.level {
            fields.push("level");
        }
        if path != category.path {
            fields.push("path");
        }
        if !fields.is_empty() {
            fixes.push(RepairFix {
                id: category.id,
                name: category.name.clone(),
                fields,
                hierarchy: HierarchyFields { children, level, path },
            });
        }
    }

    let mut cycles: Vec<Uuid> = cycles.into_iter().collect();
    cycles.sort();
    RepairPlan { fixes, orphans, cycles }
}

/// Root-first ancestor path for `start`, or `None` when its chain never
/// reaches a root.
fn resolve_lineage(
    start: Uuid,
    by_id: &HashMap<Uuid, &Category>,
    lineage: &mut HashMap<Uuid, Option<Vec<Uuid>>>,
    cycles: &mut HashSet<Uuid>,
) {
    enum End {
        Root,
        Known(Uuid),
        Broken,
        Cycle(usize),
    }

    // chain[0] is `start`, chain[i + 1] is the parent of chain[i]
    let mut chain: Vec<Uuid> = Vec::new();
    let mut position: HashMap<Uuid, usize> = HashMap::new();
    let mut cursor = start;
    let end = loop {
        if lineage.contains_key(&cursor) {
            break End::Known(cursor);
        }
        if let Some(&at) = position.get(&cursor) {
            break End::Cycle(at);
        }
        position.insert(cursor, chain.len());
        chain.push(cursor);
        match by_id.get(&cursor).and_then(|c| c.parent) {
            None => break End::Root,
            Some(parent) if !by_id.contains_key(&parent) => break End::Broken,
            Some(parent) => cursor = parent,
        }
    };

    let mut above: Option<Vec<Uuid>> = match end {
        End::Root => {
            // the last element is itself the root
            let root = chain.pop();
            if let Some(root) = root {
                lineage.insert(root, Some(Vec::new()));
                Some(vec![root])
            } else {
                return;
            }
        }
        End::Known(ancestor) => lineage
            .get(&ancestor)
            .cloned()
            .flatten()
            .map(|mut path| {
                path.push(ancestor);
                path
            }),
        End::Broken => None,
        End::Cycle(at) => {
            cycles.extend(chain[at..].iter().copied());
            None
        }
    };

    for id in chain.into_iter().rev() {
        lineage.insert(id, above.clone());
        if let Some(path) = above.as_mut() {
            path.push(id);
        }
    }
}

fn reconcile_children(current: &[Uuid], wanted: &[Uuid]) -> Vec<Uuid> {
    let wanted_set: HashSet<&Uuid> = wanted.iter().collect();
    let mut seen = HashSet::new();
    let mut out: Vec<Uuid> = current
        .iter()
        .filter(|id| wanted_set.contains(id) && seen.insert(**id))
        .copied()
        .collect();
    out.extend(wanted.iter().filter(|id| !seen.contains(*id)).copied());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::category;

    fn linked(parent: &mut Category, name: &str) -> Category {
        let child = category(name, Some(parent));
        parent.children.push(child.id);
        child
    }

    #[test]
    fn forest_nests_children_in_input_order() {
        let mut electronics = category("Electronics", None);
        let mut phones = linked(&mut electronics, "Phones");
        let laptops = linked(&mut electronics, "Laptops");
        let smartphones = linked(&mut phones, "Smartphones");
        let books = category("Books", None);

        let forest = build_forest(vec![
            electronics.clone(),
            phones.clone(),
            laptops.clone(),
            smartphones.clone(),
            books.clone(),
        ]);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].id(), electronics.id);
        assert_eq!(forest[1].id(), books.id);
        let kids: Vec<_> = forest[0].children.iter().map(|n| n.id()).collect();
        assert_eq!(kids, vec![phones.id, laptops.id]);
        assert_eq!(forest[0].children[0].children[0].id(), smartphones.id);
    }

    #[test]
    fn forest_drops_subtree_of_missing_parent() {
        let mut electronics = category("Electronics", None);
        let mut phones = linked(&mut electronics, "Phones");
        let smartphones = linked(&mut phones, "Smartphones");

        // Phones filtered out (inactive): Smartphones must not surface anywhere
        let forest = build_forest(vec![electronics.clone(), smartphones]);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].children.is_empty());

        let mut count = 0;
        forest[0].walk(&mut |_| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn forest_ignores_cycles() {
        let mut a = category("A", None);
        let mut b = category("B", None);
        a.parent = Some(b.id);
        b.parent = Some(a.id);
        let root = category("Root", None);
        let forest = build_forest(vec![a, b, root.clone()]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id(), root.id);
    }

    #[test]
    fn consistent_hierarchy_needs_no_repair() {
        let mut electronics = category("Electronics", None);
        let mut phones = linked(&mut electronics, "Phones");
        let smartphones = linked(&mut phones, "Smartphones");
        let plan = plan_repair(&[electronics, phones, smartphones]);
        assert!(plan.fixes.is_empty());
        assert!(plan.orphans.is_empty());
        assert!(plan.cycles.is_empty());
    }

    #[test]
    fn repair_restores_missing_child_link_and_bad_path() {
        let electronics = category("Electronics", None);
        let mut phones = category("Phones", Some(&electronics));
        let mut smartphones = category("Smartphones", Some(&phones));
        phones.children.push(smartphones.id);
        smartphones.level = 7;
        smartphones.path = vec![];

        let plan = plan_repair(&[electronics.clone(), phones.clone(), smartphones.clone()]);
        assert_eq!(plan.fixes.len(), 2);

        let parent_fix = plan.fixes.iter().find(|f| f.id == electronics.id).unwrap();
        assert_eq!(parent_fix.fields, vec!["children"]);
        assert_eq!(parent_fix.hierarchy.children, vec![phones.id]);

        let leaf_fix = plan.fixes.iter().find(|f| f.id == smartphones.id).unwrap();
        assert_eq!(leaf_fix.fields, vec!["level", "path"]);
        assert_eq!(leaf_fix.hierarchy.level, 2);
        assert_eq!(leaf_fix.hierarchy.path, vec![electronics.id, phones.id]);
    }

    #[test]
    fn repair_drops_dangling_and_duplicate_child_ids() {
        let mut electronics = category("Electronics", None);
        let phones = linked(&mut electronics, "Phones");
        electronics.children.push(phones.id);
        electronics.children.push(Uuid::new_v4());

        let plan = plan_repair(&[electronics.clone(), phones.clone()]);
        assert_eq!(plan.fixes.len(), 1);
        assert_eq!(plan.fixes[0].hierarchy.children, vec![phones.id]);
    }

    #[test]
    fn repair_reports_orphans_and_cycles_without_rewriting_their_paths() {
        let ghost = category("Ghost", None);
        let orphan = category("Orphan", Some(&ghost));

        let mut a = category("A", None);
        let mut b = category("B", None);
        a.parent = Some(b.id);
        b.parent = Some(a.id);
        a.children.push(b.id);
        b.children.push(a.id);
        let below = category("Below", Some(&a));
        a.children.push(below.id);

        let plan = plan_repair(&[orphan.clone(), a.clone(), b.clone(), below.clone()]);
        assert_eq!(plan.orphans, vec![orphan.id]);
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(plan.cycles, expected);
        assert!(plan.fixes.is_empty());
    }
}
