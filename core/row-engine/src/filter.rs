//! FILENAME: core/row-engine/src/filter.rs
//! Filter step - rebuilds the after-filter child lists.
//!
//! The step itself owns no predicate. It asks an evaluator whether any
//! filter is active and whether a given node passes, then rewrites every
//! `children_after_filter` list bottom-up: a leaf survives when it passes,
//! a group survives when it still has surviving children (or, under the
//! self-and-children policy, when its own values pass). Re-running with
//! unchanged inputs reproduces the same lists. Selectable flags follow
//! visibility so hidden rows cannot be newly selected.

use grid_model::{ChildList, NodeKey, RowNode, RowTree};

use crate::changed_path::ChangedPath;
use crate::criteria::ColumnFilterModel;
use crate::definition::GroupFilterPolicy;
use crate::field::FieldRegistry;

// ============================================================================
// EVALUATOR SEAM
// ============================================================================

/// Predicate collaborator consulted by the filter step.
pub trait FilterEvaluator<T> {
    /// When false the step copies the after-group lists through untouched.
    fn is_filter_active(&self) -> bool;
    /// Whether a node's values pass every active filter.
    fn passes(&self, node: &RowNode<T>) -> bool;
}

/// Built-in evaluator over the provided column filter model.
pub struct CriteriaEvaluator<'a, T> {
    fields: &'a FieldRegistry<T>,
    model: &'a ColumnFilterModel,
}

impl<'a, T> CriteriaEvaluator<'a, T> {
    pub fn new(fields: &'a FieldRegistry<T>, model: &'a ColumnFilterModel) -> Self {
        CriteriaEvaluator { fields, model }
    }
}

impl<'a, T> FilterEvaluator<T> for CriteriaEvaluator<'a, T> {
    fn is_filter_active(&self) -> bool {
        self.model.is_active()
    }

    fn passes(&self, node: &RowNode<T>) -> bool {
        self.model
            .iter()
            .all(|(col_id, criteria)| criteria.matches(&self.fields.node_value(col_id, node)))
    }
}

// ============================================================================
// FILTER STEP
// ============================================================================

/// Rebuilds `children_after_filter` for every node on the changed path
/// (or the whole tree), then refreshes selectable flags.
pub fn run_filter<T>(
    tree: &mut RowTree<T>,
    evaluator: &dyn FilterEvaluator<T>,
    policy: GroupFilterPolicy,
    groups_selectable: bool,
    changed: Option<&ChangedPath>,
) {
    let mut order: Vec<NodeKey> = Vec::new();
    match changed {
        Some(path) => {
            path.for_each_changed_post_order(tree, ChildList::AfterGroup, &mut |key| {
                order.push(key)
            });
        }
        None => tree.for_each_post_order(ChildList::AfterGroup, &mut |key| order.push(key)),
    }

    let active = evaluator.is_filter_active();
    for key in order {
        let children = tree.children_of(key, ChildList::AfterGroup).to_vec();
        let kept = if active {
            filter_children(tree, &children, evaluator, policy)
        } else {
            children
        };
        if let Some(node) = tree.get_mut(key) {
            node.children_after_filter = kept;
        }
    }

    update_selectable_flags(tree, groups_selectable);
}

/// Children are tested in order; bottom-up traversal guarantees group
/// children already carry fresh after-filter lists.
fn filter_children<T>(
    tree: &RowTree<T>,
    children: &[NodeKey],
    evaluator: &dyn FilterEvaluator<T>,
    policy: GroupFilterPolicy,
) -> Vec<NodeKey> {
    let mut kept = Vec::with_capacity(children.len());
    for &child_key in children {
        let include = match tree.get(child_key) {
            Some(child) if child.group => {
                !child.children_after_filter.is_empty()
                    || (policy == GroupFilterPolicy::SelfAndChildren && evaluator.passes(child))
            }
            Some(child) => evaluator.passes(child),
            // Dangling keys drop out of the visible set.
            None => false,
        };
        if include {
            kept.push(child_key);
        }
    }
    kept
}

/// Only rows that survived filtering can be selected. The sweep is over
/// the whole tree on purpose: rows that just dropped out must lose the
/// flag even when the refresh was scoped.
fn update_selectable_flags<T>(tree: &mut RowTree<T>, groups_selectable: bool) {
    tree.for_each_node_mut(&mut |node| node.selectable = false);

    let mut visible: Vec<NodeKey> = Vec::new();
    collect_visible(tree, tree.root_key(), &mut visible);

    for key in visible {
        if let Some(node) = tree.get_mut(key) {
            node.selectable = if node.group { groups_selectable } else { true };
        }
    }
}

fn collect_visible<T>(tree: &RowTree<T>, key: NodeKey, out: &mut Vec<NodeKey>) {
    for &child in tree.children_of(key, ChildList::AfterFilter) {
        out.push(child);
        collect_visible(tree, child, out);
    }
}

// ============================================================================
// TESTS
// ============================================================================
