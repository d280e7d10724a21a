//! FILENAME: core/row-engine/src/changed_path.rs
//! Changed-path tracking - scopes pipeline work after a transaction.
//!
//! A full row-data load touches every node, but a transaction usually
//! touches a handful. The changed path records, per parent, which children
//! sit on the route from the root to an affected node. Stages that walk it
//! only recompute the recorded branches; everything off the path keeps the
//! results of the previous pass. When inactive the walk degrades to the
//! whole tree, which is what a full reload wants.

use grid_model::{ChildList, NodeKey, RowTree};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

// ============================================================================
// CHANGED PATH
// ============================================================================

pub struct ChangedPath {
    active: bool,
    root: NodeKey,
    /// Children on the changed route, keyed by parent.
    changed_children: FxHashMap<NodeKey, SmallVec<[NodeKey; 8]>>,
}

impl ChangedPath {
    /// A fresh path starts active with nothing recorded.
    pub fn new(root: NodeKey) -> Self {
        ChangedPath {
            active: true,
            root,
            changed_children: FxHashMap::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Downgrade to whole-tree traversal. There is no way back; a stage
    /// that cannot work incrementally (grouping, pivoting) turns the
    /// path off for everything downstream.
    pub fn set_inactive(&mut self) {
        self.active = false;
    }

    pub fn root_key(&self) -> NodeKey {
        self.root
    }

    pub fn has_changes(&self) -> bool {
        !self.changed_children.is_empty()
    }

    /// Records the route from `key` up to the root. Safe to call with a
    /// key that is already on the path; links are deduplicated.
    pub fn add_parent_chain<T>(&mut self, tree: &RowTree<T>, key: NodeKey) {
        if !self.active {
            return;
        }
        let mut current = key;
        loop {
            let parent = match tree.get(current).and_then(|node| node.parent) {
                Some(parent) => parent,
                None => break,
            };
            let branch = self.changed_children.entry(parent).or_default();
            if branch.contains(&current) {
                // The rest of the chain is already recorded.
                break;
            }
            branch.push(current);
            current = parent;
        }
    }

    pub fn changed_children_of(&self, key: NodeKey) -> &[NodeKey] {
        self.changed_children
            .get(&key)
            .map(|branch| branch.as_slice())
            .unwrap_or(&[])
    }

    /// Post-order walk (children before parent, root last) over the
    /// changed branches, or over the whole tree when inactive.
    pub fn for_each_changed_post_order<T>(
        &self,
        tree: &RowTree<T>,
        list: ChildList,
        f: &mut dyn FnMut(NodeKey),
    ) {
        if self.active {
            self.walk_changed(self.root, f);
        } else {
            tree.for_each_post_order(list, f);
        }
    }

    fn walk_changed(&self, key: NodeKey, f: &mut dyn FnMut(NodeKey)) {
        if let Some(branch) = self.changed_children.get(&key) {
            for &child in branch {
                self.walk_changed(child, f);
            }
        }
        f(key);
    }
}

// ============================================================================
// TESTS
// ============================================================================
