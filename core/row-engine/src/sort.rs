//! FILENAME: core/row-engine/src/sort.rs
//! Sort step - rebuilds the after-sort child lists.
//!
//! Each node's `children_after_sort` is a permutation of its
//! `children_after_filter`, produced by a stable multi-key sort over the
//! active sort descriptors: the first descriptor decides, ties fall
//! through to the next, and a full tie keeps the after-filter order.
//! Columns may register a custom comparator; everything else compares
//! through the field registry. An explicit id-to-position map (set after
//! a drag reorder) overrides the comparators for all-leaf arrays.

use std::cmp::Ordering;

use grid_model::{ChildList, NodeKey, RowId, RowNode, RowTree};
use rustc_hash::FxHashMap;

use crate::changed_path::ChangedPath;
use crate::definition::{SortDirection, SortModelItem};
use crate::field::{FieldRegistry, FieldValue};

// ============================================================================
// COMPARATORS
// ============================================================================

pub type RowComparator<T> = Box<dyn Fn(&RowNode<T>, &RowNode<T>) -> Ordering>;

/// Custom per-column comparators, keyed by column id. A registered
/// comparator replaces the field-value comparison for that column; the
/// direction inversion still applies on top.
pub struct ComparatorRegistry<T> {
    comparators: FxHashMap<String, RowComparator<T>>,
}

impl<T> ComparatorRegistry<T> {
    pub fn new() -> Self {
        ComparatorRegistry {
            comparators: FxHashMap::default(),
        }
    }

    pub fn register(
        &mut self,
        col_id: impl Into<String>,
        comparator: impl Fn(&RowNode<T>, &RowNode<T>) -> Ordering + 'static,
    ) {
        self.comparators.insert(col_id.into(), Box::new(comparator));
    }

    pub fn get(&self, col_id: &str) -> Option<&RowComparator<T>> {
        self.comparators.get(col_id)
    }

    pub fn has(&self, col_id: &str) -> bool {
        self.comparators.contains_key(col_id)
    }
}

impl<T> Default for ComparatorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SORT STEP
// ============================================================================

/// Rebuilds `children_after_sort` for every node on the changed path (or
/// every visible node). Each group's children sort independently.
pub fn run_sort<T>(
    tree: &mut RowTree<T>,
    sort_model: &[SortModelItem],
    comparators: &ComparatorRegistry<T>,
    fields: &FieldRegistry<T>,
    row_node_order: Option<&FxHashMap<RowId, usize>>,
    changed: Option<&ChangedPath>,
) {
    let mut order: Vec<NodeKey> = Vec::new();
    match changed {
        Some(path) => {
            path.for_each_changed_post_order(tree, ChildList::AfterFilter, &mut |key| {
                order.push(key)
            });
        }
        None => tree.for_each_post_order(ChildList::AfterFilter, &mut |key| order.push(key)),
    }

    for key in order {
        let mut children = tree.children_of(key, ChildList::AfterFilter).to_vec();
        if let Some(position_of) = row_node_order {
            if is_leaf_array(tree, &children) {
                sort_by_position(tree, &mut children, position_of);
                if let Some(node) = tree.get_mut(key) {
                    node.children_after_sort = children;
                }
                continue;
            }
        }
        if !sort_model.is_empty() {
            sort_by_model(tree, &mut children, sort_model, comparators, fields);
        }
        if let Some(node) = tree.get_mut(key) {
            node.children_after_sort = children;
        }
    }
}

fn is_leaf_array<T>(tree: &RowTree<T>, children: &[NodeKey]) -> bool {
    children
        .iter()
        .all(|&key| tree.get(key).map(|node| !node.group).unwrap_or(true))
}

/// Stable sort by mapped position; rows missing from the map sink to the
/// end in their current relative order.
fn sort_by_position<T>(
    tree: &RowTree<T>,
    children: &mut [NodeKey],
    position_of: &FxHashMap<RowId, usize>,
) {
    children.sort_by_key(|&key| {
        tree.get(key)
            .and_then(|node| position_of.get(&node.id).copied())
            .unwrap_or(usize::MAX)
    });
}

fn sort_by_model<T>(
    tree: &RowTree<T>,
    children: &mut [NodeKey],
    sort_model: &[SortModelItem],
    comparators: &ComparatorRegistry<T>,
    fields: &FieldRegistry<T>,
) {
    children.sort_by(|&a, &b| match (tree.get(a), tree.get(b)) {
        (Some(left), Some(right)) => compare_nodes(left, right, sort_model, comparators, fields),
        // Dangling keys hold their position; the filter step culls them.
        _ => Ordering::Equal,
    });
}

fn compare_nodes<T>(
    a: &RowNode<T>,
    b: &RowNode<T>,
    sort_model: &[SortModelItem],
    comparators: &ComparatorRegistry<T>,
    fields: &FieldRegistry<T>,
) -> Ordering {
    for item in sort_model {
        let ord = match comparators.get(&item.col_id) {
            Some(comparator) => comparator(a, b),
            None => FieldValue::compare(
                &fields.node_value(&item.col_id, a),
                &fields.node_value(&item.col_id, b),
            ),
        };
        let ord = match item.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Sale {
        region: &'static str,
        amount: f64,
    }

    fn registry() -> FieldRegistry<Sale> {
        let mut fields = FieldRegistry::new();
        fields.register("region", |sale: &Sale| sale.region.into());
        fields.register("amount", |sale: &Sale| sale.amount.into());
        fields
    }

    /// Flat tree: root's filter list holds the leaves in insertion order.
    fn flat_tree(rows: &[(&'static str, &'static str, f64)]) -> RowTree<Sale> {
        let mut tree: RowTree<Sale> = RowTree::new();
        let root = tree.root_key();
        let mut keys = Vec::new();
        for &(id, region, amount) in rows {
            let key = tree.insert(RowNode::new_leaf(id.to_string(), Sale { region, amount }, 0));
            if let Some(node) = tree.get_mut(key) {
                node.parent = Some(root);
            }
            keys.push(key);
        }
        let root_node = tree.root_mut().unwrap();
        root_node.all_leaf_children = keys.clone();
        root_node.children_after_group = keys.clone();
        root_node.children_after_filter = keys;
        tree
    }

    fn sorted_ids(tree: &RowTree<Sale>) -> Vec<String> {
        let mut ids = Vec::new();
        tree.for_each_depth_first(ChildList::AfterSort, &mut |node| ids.push(node.id.clone()));
        ids
    }

    #[test]
    fn test_single_key_both_directions() {
        let mut tree = flat_tree(&[("r1", "North", 30.0), ("r2", "South", 10.0), ("r3", "East", 20.0)]);
        let comparators = ComparatorRegistry::new();
        let fields = registry();

        let asc = vec![SortModelItem::ascending("amount")];
        run_sort(&mut tree, &asc, &comparators, &fields, None, None);
        assert_eq!(sorted_ids(&tree), vec!["r2", "r3", "r1"]);

        let desc = vec![SortModelItem::descending("amount")];
        run_sort(&mut tree, &desc, &comparators, &fields, None, None);
        assert_eq!(sorted_ids(&tree), vec!["r1", "r3", "r2"]);
    }

    #[test]
    fn test_multi_key_falls_through_on_ties() {
        let mut tree = flat_tree(&[
            ("r1", "North", 20.0),
            ("r2", "South", 5.0),
            ("r3", "North", 10.0),
        ]);
        let comparators = ComparatorRegistry::new();
        let fields = registry();

        let model = vec![
            SortModelItem::ascending("region"),
            SortModelItem::ascending("amount"),
        ];
        run_sort(&mut tree, &model, &comparators, &fields, None, None);
        assert_eq!(sorted_ids(&tree), vec!["r3", "r1", "r2"]);
    }

    #[test]
    fn test_full_tie_preserves_filter_order() {
        let mut tree = flat_tree(&[
            ("r1", "North", 10.0),
            ("r2", "North", 10.0),
            ("r3", "North", 10.0),
        ]);
        let comparators = ComparatorRegistry::new();
        let fields = registry();

        let model = vec![
            SortModelItem::ascending("region"),
            SortModelItem::ascending("amount"),
        ];
        run_sort(&mut tree, &model, &comparators, &fields, None, None);
        assert_eq!(sorted_ids(&tree), vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_empty_model_copies_filter_order() {
        let mut tree = flat_tree(&[("r1", "B", 2.0), ("r2", "A", 1.0)]);
        let comparators = ComparatorRegistry::new();
        let fields = registry();

        run_sort(&mut tree, &[], &comparators, &fields, None, None);
        assert_eq!(sorted_ids(&tree), vec!["r1", "r2"]);
    }

    #[test]
    fn test_custom_comparator_replaces_field_comparison() {
        let mut tree = flat_tree(&[("r1", "North", 1.0), ("r2", "South", 2.0)]);
        let mut comparators = ComparatorRegistry::new();
        // Comparator that inverts the natural amount order.
        comparators.register("amount", |a: &RowNode<Sale>, b: &RowNode<Sale>| {
            let left = a.data.as_ref().map(|s| s.amount).unwrap_or(0.0);
            let right = b.data.as_ref().map(|s| s.amount).unwrap_or(0.0);
            right.partial_cmp(&left).unwrap_or(Ordering::Equal)
        });
        let fields = registry();

        let model = vec![SortModelItem::ascending("amount")];
        run_sort(&mut tree, &model, &comparators, &fields, None, None);
        assert_eq!(sorted_ids(&tree), vec!["r2", "r1"]);
    }

    #[test]
    fn test_row_node_order_overrides_comparators() {
        let mut tree = flat_tree(&[("r1", "North", 1.0), ("r2", "South", 2.0), ("r3", "East", 3.0)]);
        let comparators = ComparatorRegistry::new();
        let fields = registry();

        let mut positions: FxHashMap<RowId, usize> = FxHashMap::default();
        positions.insert("r3".to_string(), 0);
        positions.insert("r1".to_string(), 1);
        positions.insert("r2".to_string(), 2);

        // The active sort would give r1, r2, r3; the map wins.
        let model = vec![SortModelItem::ascending("amount")];
        run_sort(&mut tree, &model, &comparators, &fields, Some(&positions), None);
        assert_eq!(sorted_ids(&tree), vec!["r3", "r1", "r2"]);
    }

    #[test]
    fn test_rows_missing_from_order_map_sink_to_end() {
        let mut tree = flat_tree(&[("r1", "North", 1.0), ("r2", "South", 2.0), ("r3", "East", 3.0)]);
        let comparators = ComparatorRegistry::new();
        let fields = registry();

        let mut positions: FxHashMap<RowId, usize> = FxHashMap::default();
        positions.insert("r2".to_string(), 0);

        run_sort(&mut tree, &[], &comparators, &fields, Some(&positions), None);
        assert_eq!(sorted_ids(&tree), vec!["r2", "r1", "r3"]);
    }

    #[test]
    fn test_groups_sort_per_level() {
        let mut tree: RowTree<Sale> = RowTree::new();
        let root = tree.root_key();
        let g_s = tree.insert(RowNode::new_group("g-s".into(), Some("South".into()), None, 0));
        let g_n = tree.insert(RowNode::new_group("g-n".into(), Some("North".into()), None, 0));
        let s1 = tree.insert(RowNode::new_leaf(
            "s1".into(),
            Sale { region: "South", amount: 9.0 },
            1,
        ));
        let s2 = tree.insert(RowNode::new_leaf(
            "s2".into(),
            Sale { region: "South", amount: 3.0 },
            1,
        ));
        for (key, parent) in [(g_s, root), (g_n, root), (s1, g_s), (s2, g_s)] {
            if let Some(node) = tree.get_mut(key) {
                node.parent = Some(parent);
            }
        }
        tree.root_mut().unwrap().children_after_filter = vec![g_s, g_n];
        tree.get_mut(g_s).unwrap().children_after_filter = vec![s1, s2];

        let comparators = ComparatorRegistry::new();
        let fields = registry();
        let model = vec![
            SortModelItem::ascending("region"),
            SortModelItem::ascending("amount"),
        ];
        run_sort(&mut tree, &model, &comparators, &fields, None, None);

        // Groups compare through their key fallback, leaves by amount.
        assert_eq!(sorted_ids(&tree), vec!["g-n", "g-s", "s2", "s1"]);
    }

    #[test]
    fn test_scoped_run_leaves_other_branches_alone() {
        let mut tree: RowTree<Sale> = RowTree::new();
        let root = tree.root_key();
        let g_a = tree.insert(RowNode::new_group("g-a".into(), Some("A".into()), None, 0));
        let g_b = tree.insert(RowNode::new_group("g-b".into(), Some("B".into()), None, 0));
        let a1 = tree.insert(RowNode::new_leaf("a1".into(), Sale { region: "A", amount: 2.0 }, 1));
        let a2 = tree.insert(RowNode::new_leaf("a2".into(), Sale { region: "A", amount: 1.0 }, 1));
        let b1 = tree.insert(RowNode::new_leaf("b1".into(), Sale { region: "B", amount: 2.0 }, 1));
        let b2 = tree.insert(RowNode::new_leaf("b2".into(), Sale { region: "B", amount: 1.0 }, 1));
        for (key, parent) in [(g_a, root), (g_b, root), (a1, g_a), (a2, g_a), (b1, g_b), (b2, g_b)] {
            if let Some(node) = tree.get_mut(key) {
                node.parent = Some(parent);
            }
        }
        tree.root_mut().unwrap().children_after_filter = vec![g_a, g_b];
        tree.get_mut(g_a).unwrap().children_after_filter = vec![a1, a2];
        tree.get_mut(g_b).unwrap().children_after_filter = vec![b1, b2];

        let comparators = ComparatorRegistry::new();
        let fields = registry();
        let model = vec![SortModelItem::ascending("amount")];
        run_sort(&mut tree, &model, &comparators, &fields, None, None);
        assert_eq!(tree.get(g_b).unwrap().children_after_sort, vec![b2, b1]);

        // Scramble branch B, then refresh only branch A: the scramble
        // must survive because B is off the changed path.
        tree.get_mut(g_b).unwrap().children_after_sort = vec![b1, b2];
        let mut path = ChangedPath::new(tree.root_key());
        path.add_parent_chain(&tree, a1);
        run_sort(&mut tree, &model, &comparators, &fields, None, Some(&path));

        assert_eq!(tree.get(g_a).unwrap().children_after_sort, vec![a2, a1]);
        assert_eq!(tree.get(g_b).unwrap().children_after_sort, vec![b1, b2]);
    }
}
