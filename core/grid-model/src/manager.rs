//! FILENAME: core/grid-model/src/manager.rs
//! PURPOSE: Node identity management: building and patching the row tree.
//! CONTEXT: This file defines the `RowNodeManager`, the only component
//! allowed to create or destroy row nodes. A full `set_row_data` discards
//! the previous generation outright and rebuilds tree and id index from
//! scratch; `apply_transaction` patches both incrementally. All user-data
//! errors (duplicate ids, unresolvable items) degrade per item with a
//! warning instead of failing the call.

use log::warn;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::RowDataError;
use crate::node::{NodeKey, RowId, RowNode, SelectionState};
use crate::transaction::{RowDataTransaction, TransactionApplied, TransactionResult};
use crate::tree::RowTree;

// ============================================================================
// HOST CALLBACKS
// ============================================================================

/// Result of the deprecated child-extraction callback for one record of
/// nested (legacy tree) row data. `children` are owned payloads, typically
/// cloned out of the parent record by the callback.
pub struct NodeChildDetails<T> {
    /// Whether the record is a group. Non-groups are treated as plain
    /// leaves and any `children` are ignored.
    pub group: bool,
    /// Group key, used for expand-state restoration.
    pub key: Option<String>,
    /// Explicit initial expansion; overrides both the saved expand-state
    /// map and the default-expanded policy.
    pub expanded: Option<bool>,
    pub children: Vec<T>,
}

pub type GetRowIdFn<T> = Box<dyn Fn(&T) -> RowId>;
pub type RowEqFn<T> = Box<dyn Fn(&T, &T) -> bool>;
pub type IsRowMasterFn<T> = Box<dyn Fn(&T) -> bool>;
pub type GetChildDetailsFn<T> = Box<dyn Fn(&T) -> Option<NodeChildDetails<T>>>;

/// The callbacks through which the manager reads the otherwise opaque row
/// payload. All optional; with none configured, rows get counter ids and
/// transactions can only resolve nothing (items are skipped with a
/// warning).
pub struct RowCallbacks<T> {
    /// Extracts the public id from a payload. When absent, ids come from
    /// an internal counter that resets on every full data replacement.
    pub get_row_id: Option<GetRowIdFn<T>>,
    /// Row equality for resolving remove/update items when no id function
    /// is configured. Scanned linearly against the current leaves, O(n)
    /// per item.
    pub row_eq: Option<RowEqFn<T>>,
    /// Master/detail predicate. Absent means no row is a master row.
    pub is_row_master: Option<IsRowMasterFn<T>>,
    /// Deprecated nested-children extraction. Configuring this switches
    /// the manager into legacy tree mode, which rejects transactions.
    pub get_child_details: Option<GetChildDetailsFn<T>>,
}

impl<T> Default for RowCallbacks<T> {
    fn default() -> Self {
        RowCallbacks {
            get_row_id: None,
            row_eq: None,
            is_row_master: None,
            get_child_details: None,
        }
    }
}

impl<T> RowCallbacks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_get_row_id(mut self, f: impl Fn(&T) -> RowId + 'static) -> Self {
        self.get_row_id = Some(Box::new(f));
        self
    }

    pub fn with_row_eq(mut self, f: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.row_eq = Some(Box::new(f));
        self
    }

    pub fn with_is_row_master(mut self, f: impl Fn(&T) -> bool + 'static) -> Self {
        self.is_row_master = Some(Box::new(f));
        self
    }

    pub fn with_child_details(
        mut self,
        f: impl Fn(&T) -> Option<NodeChildDetails<T>> + 'static,
    ) -> Self {
        self.get_child_details = Some(Box::new(f));
        self
    }
}

// ============================================================================
// NODE MANAGER
// ============================================================================

pub struct RowNodeManager<T> {
    tree: RowTree<T>,
    callbacks: RowCallbacks<T>,
    /// Counter for internally minted ids. Reset by `set_row_data`, kept
    /// running across transactions.
    next_row_id: u64,
    /// Default-expanded threshold: levels below it start expanded,
    /// -1 means all levels.
    group_default_expanded: i32,
    /// Saved expand state by group key, applied when (re)building groups.
    expand_state: FxHashMap<String, bool>,
}

impl<T> RowNodeManager<T> {
    pub fn new(callbacks: RowCallbacks<T>) -> Self {
        RowNodeManager {
            tree: RowTree::new(),
            callbacks,
            next_row_id: 0,
            group_default_expanded: 0,
            expand_state: FxHashMap::default(),
        }
    }

    pub fn tree(&self) -> &RowTree<T> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut RowTree<T> {
        &mut self.tree
    }

    /// Legacy tree mode is active whenever the child-extraction callback
    /// is configured.
    pub fn is_legacy_tree_mode(&self) -> bool {
        self.callbacks.get_child_details.is_some()
    }

    pub fn set_group_default_expanded(&mut self, threshold: i32) {
        self.group_default_expanded = threshold;
    }

    pub fn set_expand_state(&mut self, state: FxHashMap<String, bool>) {
        self.expand_state = state;
    }

    /// Whether a group at the given level starts expanded under the
    /// default-expanded policy.
    pub fn default_expanded_for_level(&self, level: i32) -> bool {
        match self.group_default_expanded {
            -1 => true,
            threshold => level < threshold,
        }
    }

    /// Number of data rows under the root.
    pub fn leaf_count(&self) -> usize {
        self.tree
            .root()
            .map(|root| root.all_leaf_children.len())
            .unwrap_or(0)
    }

    // ========================================================================
    // FULL DATA REPLACEMENT
    // ========================================================================

    /// Replaces the entire tree with fresh nodes for `rows`. Every
    /// previously issued node and id is invalidated and the id counter
    /// restarts at 0.
    ///
    /// Flat data fills the root's `all_leaf_children`; nested (legacy
    /// tree) data additionally materializes `children_after_group` on the
    /// root and every group, with leaves harvested recursively.
    pub fn set_row_data(&mut self, rows: Vec<T>) {
        self.next_row_id = 0;
        self.tree.clear();
        let root_key = self.tree.root_key();

        if self.is_legacy_tree_mode() {
            let top_level = self.build_nested(rows, 0, root_key);
            if let Some(root) = self.tree.root_mut() {
                root.children_after_group = top_level;
            }
            let leaves = self.tree.collect_leaves(root_key);
            if let Some(root) = self.tree.root_mut() {
                root.all_leaf_children = leaves;
            }
        } else {
            let mut leaves = Vec::with_capacity(rows.len());
            for row in rows {
                leaves.push(self.create_data_node(row, 0, root_key));
            }
            if let Some(root) = self.tree.root_mut() {
                root.all_leaf_children = leaves;
            }
        }
    }

    fn build_nested(&mut self, rows: Vec<T>, level: i32, parent: NodeKey) -> Vec<NodeKey> {
        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            let details = match &self.callbacks.get_child_details {
                Some(f) => f(&row),
                None => None,
            };
            match details {
                Some(d) if d.group => keys.push(self.create_group_node(row, d, level, parent)),
                _ => keys.push(self.create_data_node(row, level, parent)),
            }
        }
        keys
    }

    fn create_group_node(
        &mut self,
        row: T,
        details: NodeChildDetails<T>,
        level: i32,
        parent: NodeKey,
    ) -> NodeKey {
        let expanded = self.resolve_initial_expansion(&details, level);
        let id = self.mint_id(&row);
        self.warn_on_duplicate(&id);

        let mut node = RowNode::new_group(id, details.key, Some(row), level);
        node.expanded = expanded;
        node.parent = Some(parent);
        let key = self.tree.insert(node);

        let children = self.build_nested(details.children, level + 1, key);
        if let Some(group) = self.tree.get_mut(key) {
            group.children_after_group = children;
        }
        let leaves = self.tree.collect_leaves(key);
        if let Some(group) = self.tree.get_mut(key) {
            group.all_leaf_children = leaves;
        }
        key
    }

    /// Expansion precedence: explicit flag from the callback, then the
    /// saved expand-state entry for the group key, then the threshold
    /// policy.
    fn resolve_initial_expansion(&self, details: &NodeChildDetails<T>, level: i32) -> bool {
        if let Some(explicit) = details.expanded {
            return explicit;
        }
        if let Some(key) = &details.key {
            if let Some(saved) = self.expand_state.get(key) {
                return *saved;
            }
        }
        self.default_expanded_for_level(level)
    }

    fn create_data_node(&mut self, row: T, level: i32, parent: NodeKey) -> NodeKey {
        let master = match &self.callbacks.is_row_master {
            Some(f) => f(&row),
            None => false,
        };
        let id = self.mint_id(&row);
        self.warn_on_duplicate(&id);

        let mut node = RowNode::new_leaf(id, row, level);
        node.master = master;
        node.parent = Some(parent);
        self.tree.insert(node)
    }

    fn mint_id(&mut self, row: &T) -> RowId {
        match &self.callbacks.get_row_id {
            Some(f) => f(row),
            None => {
                let id = self.next_row_id.to_string();
                self.next_row_id += 1;
                id
            }
        }
    }

    fn warn_on_duplicate(&self, id: &str) {
        if self.tree.contains_id(id) {
            warn!("{}", RowDataError::DuplicateId(id.to_string()));
        }
    }

    // ========================================================================
    // TRANSACTIONS
    // ========================================================================

    /// Applies one delta update. Rejected with `None` in legacy tree
    /// mode. Sections run in a fixed order: adds, then removes, then
    /// updates; each item degrades individually on resolution failure.
    pub fn apply_transaction(
        &mut self,
        tx: RowDataTransaction<T>,
    ) -> Option<TransactionApplied<T>> {
        if self.is_legacy_tree_mode() {
            warn!("{}", RowDataError::TransactionWithNestedData);
            return None;
        }

        let mut applied = TransactionApplied::new(TransactionResult::default());
        if let Some(rows) = tx.add {
            self.execute_add(rows, tx.add_index, &mut applied);
        }
        if let Some(rows) = tx.remove {
            self.execute_remove(rows, &mut applied);
        }
        if let Some(rows) = tx.update {
            self.execute_update(rows, &mut applied);
        }
        Some(applied)
    }

    fn execute_add(
        &mut self,
        rows: Vec<T>,
        add_index: Option<usize>,
        out: &mut TransactionApplied<T>,
    ) {
        let root_key = self.tree.root_key();
        let mut new_keys: SmallVec<[NodeKey; 8]> = SmallVec::new();
        for row in rows {
            let key = self.create_data_node(row, 0, root_key);
            if let Some(node) = self.tree.get(key) {
                out.result.add.push(node.id.clone());
            }
            out.changed_keys.push(key);
            new_keys.push(key);
        }

        if let Some(root) = self.tree.root_mut() {
            match add_index {
                // Inserting in input order keeps the block's order intact
                // at the insertion point.
                Some(index) => {
                    let at = index.min(root.all_leaf_children.len());
                    for (offset, key) in new_keys.iter().enumerate() {
                        root.all_leaf_children.insert(at + offset, *key);
                    }
                }
                None => root.all_leaf_children.extend(new_keys.iter().copied()),
            }
        }
    }

    fn execute_remove(&mut self, rows: Vec<T>, out: &mut TransactionApplied<T>) {
        for item in &rows {
            let Some(key) = self.resolve_item(item) else {
                warn!("{}", RowDataError::UnresolvedItem { op: "remove" });
                continue;
            };
            if let Some(root) = self.tree.root_mut() {
                if let Some(pos) = root.all_leaf_children.iter().position(|k| *k == key) {
                    root.all_leaf_children.remove(pos);
                }
            }
            if let Some(mut node) = self.tree.remove(key) {
                if let Some(parent) = node.parent {
                    out.removed_parents.push(parent);
                }
                if node.selected.is_selected() {
                    out.deselected.push(node.id.clone());
                    node.selected = SelectionState::NotSelected;
                }
                node.clear_display_position();
                out.result.remove.push(node);
            }
        }
    }

    fn execute_update(&mut self, rows: Vec<T>, out: &mut TransactionApplied<T>) {
        for item in rows {
            let Some(key) = self.resolve_item(&item) else {
                warn!("{}", RowDataError::UnresolvedItem { op: "update" });
                continue;
            };
            let master = match &self.callbacks.is_row_master {
                Some(f) => f(&item),
                None => false,
            };
            if let Some(node) = self.tree.get_mut(key) {
                node.data = Some(item);
                node.master = master;
                out.result.update.push(node.id.clone());
                out.changed_keys.push(key);
            }
        }
    }

    /// Resolves a transaction item to a live node: by id when an id
    /// function is configured, otherwise by the row-equality scan over the
    /// current leaves.
    fn resolve_item(&self, item: &T) -> Option<NodeKey> {
        if let Some(get_id) = &self.callbacks.get_row_id {
            let id = get_id(item);
            return self.tree.lookup(&id);
        }
        if let Some(eq) = &self.callbacks.row_eq {
            let root = self.tree.root()?;
            for &key in &root.all_leaf_children {
                if let Some(node) = self.tree.get(key) {
                    if let Some(data) = &node.data {
                        if eq(item, data) {
                            return Some(key);
                        }
                    }
                }
            }
        }
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        code: String,
        amount: f64,
    }

    fn item(code: &str, amount: f64) -> Item {
        Item {
            code: code.to_string(),
            amount,
        }
    }

    fn manager_with_ids() -> RowNodeManager<Item> {
        RowNodeManager::new(RowCallbacks::new().with_get_row_id(|row: &Item| row.code.clone()))
    }

    fn leaf_ids(manager: &RowNodeManager<Item>) -> Vec<String> {
        let tree = manager.tree();
        tree.root()
            .map(|root| {
                root.all_leaf_children
                    .iter()
                    .filter_map(|&k| tree.get(k).map(|n| n.id.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_counter_ids_reset_on_set_row_data_only() {
        let mut manager: RowNodeManager<Item> = RowNodeManager::new(RowCallbacks::new());
        manager.set_row_data(vec![item("a", 1.0), item("b", 2.0)]);
        assert_eq!(leaf_ids(&manager), vec!["0", "1"]);

        let tx = RowDataTransaction::new().with_add(vec![item("c", 3.0)]);
        manager.apply_transaction(tx);
        assert_eq!(leaf_ids(&manager), vec!["0", "1", "2"]);

        manager.set_row_data(vec![item("d", 4.0)]);
        assert_eq!(leaf_ids(&manager), vec!["0"]);
    }

    #[test]
    fn test_duplicate_ids_tolerated_last_write_wins() {
        let mut manager = manager_with_ids();
        manager.set_row_data(vec![item("dup", 1.0), item("dup", 2.0)]);

        // Both rows exist in the leaf list.
        assert_eq!(manager.leaf_count(), 2);
        // The index resolves to the second row.
        let tree = manager.tree();
        let key = tree.lookup("dup").unwrap();
        let node = tree.get(key).unwrap();
        assert_eq!(node.data.as_ref().unwrap().amount, 2.0);
    }

    #[test]
    fn test_master_predicate_applied_on_create_and_update() {
        let mut manager = RowNodeManager::new(
            RowCallbacks::new()
                .with_get_row_id(|row: &Item| row.code.clone())
                .with_is_row_master(|row: &Item| row.amount > 10.0),
        );
        manager.set_row_data(vec![item("a", 20.0), item("b", 1.0)]);
        let tree = manager.tree();
        assert!(tree.get(tree.lookup("a").unwrap()).unwrap().master);
        assert!(!tree.get(tree.lookup("b").unwrap()).unwrap().master);

        // Updating below the threshold reclassifies the flag.
        let tx = RowDataTransaction::new().with_update(vec![item("a", 5.0)]);
        manager.apply_transaction(tx).unwrap();
        let tree = manager.tree();
        assert!(!tree.get(tree.lookup("a").unwrap()).unwrap().master);
    }

    #[test]
    fn test_add_index_preserves_input_order() {
        let mut manager = manager_with_ids();
        manager.set_row_data(vec![item("a", 0.0), item("b", 0.0), item("c", 0.0)]);

        let tx = RowDataTransaction::new()
            .with_add(vec![item("x", 0.0), item("y", 0.0)])
            .with_add_index(1);
        manager.apply_transaction(tx).unwrap();
        assert_eq!(leaf_ids(&manager), vec!["a", "x", "y", "b", "c"]);
    }

    #[test]
    fn test_add_index_past_end_appends() {
        let mut manager = manager_with_ids();
        manager.set_row_data(vec![item("a", 0.0)]);
        let tx = RowDataTransaction::new()
            .with_add(vec![item("b", 0.0)])
            .with_add_index(99);
        manager.apply_transaction(tx).unwrap();
        assert_eq!(leaf_ids(&manager), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_by_id_and_skip_unresolved() {
        let mut manager = manager_with_ids();
        manager.set_row_data(vec![item("a", 1.0), item("b", 2.0)]);

        let tx = RowDataTransaction::new().with_remove(vec![item("missing", 0.0), item("a", 1.0)]);
        let applied = manager.apply_transaction(tx).unwrap();

        // The unresolved item is skipped, the resolvable one applies.
        assert_eq!(applied.result.remove.len(), 1);
        assert_eq!(applied.result.remove[0].id, "a");
        assert_eq!(leaf_ids(&manager), vec!["b"]);
        assert_eq!(manager.tree().lookup("a"), None);
    }

    #[test]
    fn test_remove_resolves_by_row_equality_without_id_function() {
        let mut manager: RowNodeManager<Item> =
            RowNodeManager::new(RowCallbacks::new().with_row_eq(|a: &Item, b: &Item| a.code == b.code));
        manager.set_row_data(vec![item("a", 1.0), item("b", 2.0), item("c", 3.0)]);

        let tx = RowDataTransaction::new().with_remove(vec![item("b", 99.0)]);
        let applied = manager.apply_transaction(tx).unwrap();
        assert_eq!(applied.result.remove.len(), 1);
        assert_eq!(manager.leaf_count(), 2);
    }

    #[test]
    fn test_update_replaces_payload_in_place() {
        let mut manager = manager_with_ids();
        manager.set_row_data(vec![item("a", 1.0)]);
        let key_before = manager.tree().lookup("a").unwrap();

        let tx = RowDataTransaction::new().with_update(vec![item("a", 42.0)]);
        let applied = manager.apply_transaction(tx).unwrap();

        assert_eq!(applied.result.update, vec!["a".to_string()]);
        let tree = manager.tree();
        let key_after = tree.lookup("a").unwrap();
        // Node identity is preserved: same arena key, new payload.
        assert_eq!(key_before, key_after);
        assert_eq!(tree.get(key_after).unwrap().data.as_ref().unwrap().amount, 42.0);
    }

    #[test]
    fn test_removing_selected_row_queues_deselection() {
        let mut manager = manager_with_ids();
        manager.set_row_data(vec![item("a", 1.0), item("b", 2.0)]);
        let key = manager.tree().lookup("a").unwrap();
        manager.tree_mut().get_mut(key).unwrap().selected = SelectionState::Selected;

        let tx = RowDataTransaction::new().with_remove(vec![item("a", 1.0)]);
        let applied = manager.apply_transaction(tx).unwrap();

        assert_eq!(applied.deselected, vec!["a".to_string()]);
        assert_eq!(applied.result.remove[0].selected, SelectionState::NotSelected);
    }

    // ========================================================================
    // LEGACY NESTED DATA
    // ========================================================================

    #[derive(Debug, Clone)]
    struct TreeRow {
        name: String,
        children: Vec<TreeRow>,
    }

    fn tree_row(name: &str, children: Vec<TreeRow>) -> TreeRow {
        TreeRow {
            name: name.to_string(),
            children,
        }
    }

    fn legacy_manager() -> RowNodeManager<TreeRow> {
        RowNodeManager::new(RowCallbacks::new().with_child_details(|row: &TreeRow| {
            if row.children.is_empty() {
                None
            } else {
                Some(NodeChildDetails {
                    group: true,
                    key: Some(row.name.clone()),
                    expanded: None,
                    children: row.children.clone(),
                })
            }
        }))
    }

    #[test]
    fn test_legacy_build_harvests_leaves() {
        let mut manager = legacy_manager();
        manager.set_row_data(vec![
            tree_row(
                "West",
                vec![tree_row("apples", vec![]), tree_row("oranges", vec![])],
            ),
            tree_row("East", vec![tree_row("pears", vec![])]),
            tree_row("loose", vec![]),
        ]);

        let tree = manager.tree();
        let root = tree.root().unwrap();
        // Two groups and one plain leaf at top level.
        assert_eq!(root.children_after_group.len(), 3);
        // Leaves harvested through the groups, groups excluded.
        assert_eq!(root.all_leaf_children.len(), 4);

        let west_key = root.children_after_group[0];
        let west = tree.get(west_key).unwrap();
        assert!(west.group);
        assert_eq!(west.key.as_deref(), Some("West"));
        assert_eq!(west.level, 0);
        assert_eq!(west.all_leaf_children.len(), 2);
        let child = tree.get(west.children_after_group[0]).unwrap();
        assert_eq!(child.level, 1);
        assert_eq!(child.parent, Some(west_key));
    }

    #[test]
    fn test_legacy_mode_rejects_transactions() {
        let mut manager = legacy_manager();
        manager.set_row_data(vec![tree_row("West", vec![tree_row("apples", vec![])])]);

        let tx = RowDataTransaction::new().with_add(vec![tree_row("loose", vec![])]);
        assert!(manager.apply_transaction(tx).is_none());
        // Nothing changed.
        assert_eq!(manager.leaf_count(), 1);
    }

    #[test]
    fn test_legacy_expansion_precedence() {
        let mut manager = legacy_manager();
        // Saved state expands "West"; the policy (threshold 0) leaves
        // everything else collapsed.
        let mut state = FxHashMap::default();
        state.insert("West".to_string(), true);
        manager.set_expand_state(state);
        manager.set_row_data(vec![
            tree_row("West", vec![tree_row("apples", vec![])]),
            tree_row("East", vec![tree_row("pears", vec![])]),
        ]);

        let tree = manager.tree();
        let root = tree.root().unwrap();
        let west = tree.get(root.children_after_group[0]).unwrap();
        let east = tree.get(root.children_after_group[1]).unwrap();
        assert!(west.expanded);
        assert!(!east.expanded);
    }

    #[test]
    fn test_default_expanded_threshold() {
        let mut manager = legacy_manager();
        manager.set_group_default_expanded(1);
        manager.set_row_data(vec![tree_row(
            "West",
            vec![tree_row("coastal", vec![tree_row("apples", vec![])])],
        )]);

        let tree = manager.tree();
        let root = tree.root().unwrap();
        let west = tree.get(root.children_after_group[0]).unwrap();
        // Level 0 is below the threshold, level 1 is not.
        assert!(west.expanded);
        let coastal = tree.get(west.children_after_group[0]).unwrap();
        assert!(!coastal.expanded);
    }

    #[test]
    fn test_all_expanded_threshold() {
        let mut manager = legacy_manager();
        manager.set_group_default_expanded(-1);
        manager.set_row_data(vec![tree_row(
            "West",
            vec![tree_row("coastal", vec![tree_row("apples", vec![])])],
        )]);

        let tree = manager.tree();
        let root = tree.root().unwrap();
        let west = tree.get(root.children_after_group[0]).unwrap();
        let coastal = tree.get(west.children_after_group[0]).unwrap();
        assert!(west.expanded && coastal.expanded);
    }
}
