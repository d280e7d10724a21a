//! FILENAME: core/row-engine/src/flatten.rs
//! Flatten step - turns the sorted tree into the display sequence.
//!
//! Depth-first walk of the after-sort lists starting at the root's
//! children: a node is emitted, then its children follow only while the
//! node is expanded. A collapsed branch is skipped outright, so its
//! descendants carry no display position at all. Every refresh clears all
//! positions first and reassigns them from scratch; stale offsets from a
//! partially changed tree are never reused.

use grid_model::{ChildList, NodeKey, RowNode, RowTree};

use crate::display::DisplayedRows;

/// Optional per-row height hook; `None` falls back to the default height.
pub type RowHeightCallback<T> = Box<dyn Fn(&RowNode<T>) -> Option<f64>>;

// ============================================================================
// FLATTEN STEP
// ============================================================================

/// Rebuilds `row_index`/`row_top` for every visible node and returns the
/// linear view. Height resolution order: the node's explicit height, the
/// callback, then `default_height`.
pub fn run_flatten<T>(
    tree: &mut RowTree<T>,
    default_height: f64,
    height_callback: Option<&RowHeightCallback<T>>,
) -> DisplayedRows {
    tree.clear_display_positions();

    let mut keys: Vec<NodeKey> = Vec::new();
    collect_visible(tree, tree.root_key(), &mut keys);

    let mut tops: Vec<f64> = Vec::with_capacity(keys.len());
    let mut top = 0.0;
    for (index, &key) in keys.iter().enumerate() {
        let height = match tree.get(key) {
            Some(node) => node
                .row_height
                .or_else(|| height_callback.and_then(|callback| callback(node)))
                .unwrap_or(default_height),
            None => default_height,
        };
        if let Some(node) = tree.get_mut(key) {
            node.row_index = Some(index);
            node.row_top = Some(top);
        }
        tops.push(top);
        top += height;
    }

    DisplayedRows::from_parts(keys, tops, top)
}

fn collect_visible<T>(tree: &RowTree<T>, key: NodeKey, out: &mut Vec<NodeKey>) {
    for &child in tree.children_of(key, ChildList::AfterSort) {
        out.push(child);
        let recurse = tree
            .get(child)
            .map(|node| node.expanded && !node.children_after_sort.is_empty())
            .unwrap_or(false);
        if recurse {
            collect_visible(tree, child, out);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
