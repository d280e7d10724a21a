//! FILENAME: core/grid-model/src/tree.rs
//! PURPOSE: Arena storage for row nodes plus the id index.
//! CONTEXT: This file defines the `RowTree` struct, the flat table that
//! owns every node of one data generation. Nodes reference each other by
//! `NodeKey` only, so ownership flows strictly root -> subtree through the
//! arena and the parent back-reference can never form a cycle. The id
//! index maps public row ids to arena keys and is rebuilt wholesale on a
//! full data replacement, patched incrementally on transactions.

use rustc_hash::FxHashMap;

use crate::node::{NodeKey, RowId, RowNode};

// ============================================================================
// CHILD LIST SELECTOR
// ============================================================================

/// Which stage output to traverse when walking the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildList {
    AfterGroup,
    AfterFilter,
    AfterSort,
}

// ============================================================================
// ROW TREE
// ============================================================================

/// Flat arena of row nodes for one data generation.
///
/// Keys are minted from a monotonic counter and never reused, including
/// across `clear()`: a key issued before a full data replacement resolves
/// to `None` afterwards instead of silently aliasing a new node.
pub struct RowTree<T> {
    nodes: FxHashMap<NodeKey, RowNode<T>>,
    /// Public id -> arena key. Last write wins under duplicate ids.
    index: FxHashMap<RowId, NodeKey>,
    root: NodeKey,
    next_key: NodeKey,
}

impl<T> RowTree<T> {
    pub fn new() -> Self {
        let mut tree = RowTree {
            nodes: FxHashMap::default(),
            index: FxHashMap::default(),
            root: 0,
            next_key: 0,
        };
        tree.root = tree.insert(RowNode::new_root());
        tree
    }

    /// Discards every node and index entry and installs a fresh root.
    /// The key counter keeps running so stale keys stay dangling.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.root = self.insert(RowNode::new_root());
    }

    pub fn root_key(&self) -> NodeKey {
        self.root
    }

    /// The root node. `None` only if an invariant was broken elsewhere;
    /// callers degrade to empty results rather than panicking.
    pub fn root(&self) -> Option<&RowNode<T>> {
        self.nodes.get(&self.root)
    }

    pub fn root_mut(&mut self) -> Option<&mut RowNode<T>> {
        let key = self.root;
        self.nodes.get_mut(&key)
    }

    /// Number of live nodes including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Stores a node, assigns its arena key and registers its id in the
    /// index (displacing any previous holder of the same id).
    pub fn insert(&mut self, node: RowNode<T>) -> NodeKey {
        let key = self.next_key;
        self.next_key += 1;
        self.index.insert(node.id.clone(), key);
        self.nodes.insert(key, node);
        key
    }

    /// Removes a node from the arena and, when the index still points at
    /// this node, from the index. Under duplicate ids the index may point
    /// at a later node with the same id; that entry is left alone. The
    /// root cannot be removed.
    pub fn remove(&mut self, key: NodeKey) -> Option<RowNode<T>> {
        if key == self.root {
            return None;
        }
        let node = self.nodes.remove(&key)?;
        if self.index.get(&node.id) == Some(&key) {
            self.index.remove(&node.id);
        }
        Some(node)
    }

    pub fn get(&self, key: NodeKey) -> Option<&RowNode<T>> {
        self.nodes.get(&key)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut RowNode<T>> {
        self.nodes.get_mut(&key)
    }

    /// Id index lookup. Under duplicate ids this resolves to the most
    /// recently inserted holder.
    pub fn lookup(&self, id: &str) -> Option<NodeKey> {
        self.index.get(id).copied()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The selected child list of a node, or an empty slice for a
    /// dangling key.
    pub fn children_of(&self, key: NodeKey, list: ChildList) -> &[NodeKey] {
        match self.nodes.get(&key) {
            Some(node) => match list {
                ChildList::AfterGroup => &node.children_after_group,
                ChildList::AfterFilter => &node.children_after_filter,
                ChildList::AfterSort => &node.children_after_sort,
            },
            None => &[],
        }
    }

    // ========================================================================
    // TRAVERSAL
    // ========================================================================

    /// Depth-first pre-order walk over the selected child list, starting
    /// at the root's children (the root itself is not visited).
    pub fn for_each_depth_first(&self, list: ChildList, f: &mut dyn FnMut(&RowNode<T>)) {
        self.walk_children(self.root, list, f);
    }

    fn walk_children(&self, key: NodeKey, list: ChildList, f: &mut dyn FnMut(&RowNode<T>)) {
        let children: Vec<NodeKey> = self.children_of(key, list).to_vec();
        for child in children {
            if let Some(node) = self.nodes.get(&child) {
                f(node);
            }
            self.walk_children(child, list, f);
        }
    }

    /// Depth-first post-order walk (children before parent, root visited
    /// last). Stage recomputations run bottom-up through this.
    pub fn for_each_post_order(&self, list: ChildList, f: &mut dyn FnMut(NodeKey)) {
        self.walk_post_order(self.root, list, f);
    }

    fn walk_post_order(&self, key: NodeKey, list: ChildList, f: &mut dyn FnMut(NodeKey)) {
        let children: Vec<NodeKey> = self.children_of(key, list).to_vec();
        for child in children {
            self.walk_post_order(child, list, f);
        }
        f(key);
    }

    /// Visits every live node, root included, in no particular order.
    pub fn for_each_node_mut(&mut self, f: &mut dyn FnMut(&mut RowNode<T>)) {
        for node in self.nodes.values_mut() {
            f(node);
        }
    }

    /// Collects the data rows underneath a node by recursing through
    /// `children_after_group`, in traversal order. Used to materialize
    /// `all_leaf_children` for pre-grouped (legacy nested) data.
    pub fn collect_leaves(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut leaves = Vec::new();
        self.collect_leaves_into(key, &mut leaves);
        leaves
    }

    fn collect_leaves_into(&self, key: NodeKey, out: &mut Vec<NodeKey>) {
        for &child in self.children_of(key, ChildList::AfterGroup).iter() {
            match self.nodes.get(&child) {
                Some(node) if node.group => self.collect_leaves_into(child, out),
                Some(_) => out.push(child),
                None => {}
            }
        }
    }

    /// Clears `row_index`/`row_top` on every node ahead of a re-flatten.
    pub fn clear_display_positions(&mut self) {
        for node in self.nodes.values_mut() {
            node.clear_display_position();
        }
    }
}

impl<T> Default for RowTree<T> {
    fn default() -> Self {
        RowTree::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
