//! FILENAME: core/row-engine/src/stage.rs
//! Stage seam - pluggable grouping, pivot and aggregation steps.
//!
//! The row model owns the filter, sort and flatten steps but delegates
//! grouping, pivoting and aggregation to installed stages. A stage gets
//! the whole tree and the changed path for the refresh; it rewrites the
//! child lists it is responsible for and leaves the rest alone. When no
//! group stage is installed the passthrough below wires every leaf
//! straight under the root.

use grid_model::{RowTree, ROOT_LEVEL};

use crate::changed_path::ChangedPath;

// ============================================================================
// STAGE TRAIT
// ============================================================================

/// A pipeline step executed between the raw row data and the filter step.
///
/// Implementations mutate the tree in place. A stage that cannot work
/// incrementally should call [`ChangedPath::set_inactive`] so downstream
/// steps fall back to whole-tree traversal.
pub trait RowNodeStage<T> {
    fn execute(&mut self, tree: &mut RowTree<T>, changed_path: Option<&mut ChangedPath>);
}

// ============================================================================
// PASSTHROUGH GROUPING
// ============================================================================

/// Default grouping when no stage is installed: every leaf becomes a
/// top-level child of the root, in row-data order.
pub fn passthrough_group<T>(tree: &mut RowTree<T>) {
    let root = tree.root_key();
    let leaves = match tree.root() {
        Some(node) => node.all_leaf_children.clone(),
        None => return,
    };

    for &key in &leaves {
        if let Some(node) = tree.get_mut(key) {
            node.parent = Some(root);
            node.level = ROOT_LEVEL + 1;
        }
    }
    if let Some(node) = tree.root_mut() {
        node.children_after_group = leaves;
    }
}

// ============================================================================
// TESTS
// ============================================================================
