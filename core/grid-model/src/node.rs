//! FILENAME: core/grid-model/src/node.rs
//! PURPOSE: Defines the row node, the identity record of the row model.
//! CONTEXT: Every user row, synthetic group and the root itself is one
//! `RowNode`. Nodes never own each other; all relations (parent, the four
//! child collections) are expressed as arena keys so the tree stays
//! cycle-free and trivially serializable.

use serde::{Deserialize, Serialize};

// ============================================================================
// KEYS AND IDS
// ============================================================================

/// Arena key of a node. Unique for the lifetime of a `RowTree`; keys are
/// never reused, so a stale key from a discarded generation resolves to
/// nothing instead of aliasing a new node.
pub type NodeKey = u32;

/// Public string identity of a row. Either extracted from the user payload
/// by a configured id function, or minted from an internal counter.
pub type RowId = String;

/// Level of the synthetic root node. Top-level user rows sit at level 0.
pub const ROOT_LEVEL: i32 = -1;

/// Reserved id of the synthetic root node.
pub const ROOT_NODE_ID: &str = "ROOT";

// ============================================================================
// SELECTION STATE
// ============================================================================

/// Tri-state selection. Groups report `Indeterminate` when only part of
/// their descendants are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionState {
    Selected,
    NotSelected,
    Indeterminate,
}

impl Default for SelectionState {
    fn default() -> Self {
        SelectionState::NotSelected
    }
}

impl SelectionState {
    pub fn is_selected(&self) -> bool {
        matches!(self, SelectionState::Selected)
    }
}

// ============================================================================
// ROW NODE
// ============================================================================

/// One identity record in the row tree.
///
/// The child collections are the outputs of the pipeline stages, in stage
/// order: grouping fills `children_after_group`, filtering narrows it into
/// `children_after_filter` (same relative order), sorting permutes that
/// into `children_after_sort`. `all_leaf_children` is the flat list of data
/// rows underneath this node in raw insertion order, maintained by the
/// node manager rather than by a stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowNode<T> {
    /// Public identity. Unique in the id index at all times; duplicate ids
    /// among live nodes are tolerated (the index keeps the last writer).
    pub id: RowId,
    /// Group key, set for group nodes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// User payload. `None` for the root and for synthetic group nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Tree depth. Root is -1, top-level user rows are 0.
    pub level: i32,
    /// Arena key of the parent. Non-owning back-reference; `None` on the
    /// root only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeKey>,
    /// True for the root and for synthetic/legacy group nodes.
    pub group: bool,
    /// True when a master/detail predicate classified this row as owning
    /// a detail row.
    pub master: bool,
    /// True for plain data rows (never true for groups or the root).
    pub leaf: bool,
    /// Expand/collapse state, driven externally. Collapsed nodes keep
    /// their subtree out of the display list entirely.
    pub expanded: bool,
    /// Tri-state selection.
    pub selected: SelectionState,
    /// Maintained by the filter stage: rows excluded by filtering are
    /// never selectable.
    pub selectable: bool,
    /// Explicit per-row height override in pixels. Rows without one fall
    /// back to the host callback, then to the configured default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_height: Option<f64>,
    /// Position in the final display list. `None` while not displayed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
    /// Pixel offset of the row top in the flattened view. `None` while
    /// not displayed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_top: Option<f64>,
    /// Grouping output: direct children of this node.
    pub children_after_group: Vec<NodeKey>,
    /// Filtering output: subset of `children_after_group`, order kept.
    pub children_after_filter: Vec<NodeKey>,
    /// Sorting output: permutation of `children_after_filter`.
    pub children_after_sort: Vec<NodeKey>,
    /// Flat list of data rows underneath this node, insertion order.
    pub all_leaf_children: Vec<NodeKey>,
}

impl<T> RowNode<T> {
    /// Creates the synthetic root node. The root is a group, carries no
    /// data and is always expanded.
    pub fn new_root() -> Self {
        RowNode {
            id: ROOT_NODE_ID.to_string(),
            key: None,
            data: None,
            level: ROOT_LEVEL,
            parent: None,
            group: true,
            master: false,
            leaf: false,
            expanded: true,
            selected: SelectionState::NotSelected,
            selectable: false,
            row_height: None,
            row_index: None,
            row_top: None,
            children_after_group: Vec::new(),
            children_after_filter: Vec::new(),
            children_after_sort: Vec::new(),
            all_leaf_children: Vec::new(),
        }
    }

    /// Creates a data row node at the given level.
    pub fn new_leaf(id: RowId, data: T, level: i32) -> Self {
        RowNode {
            id,
            key: None,
            data: Some(data),
            level,
            parent: None,
            group: false,
            master: false,
            leaf: true,
            expanded: false,
            selected: SelectionState::NotSelected,
            selectable: true,
            row_height: None,
            row_index: None,
            row_top: None,
            children_after_group: Vec::new(),
            children_after_filter: Vec::new(),
            children_after_sort: Vec::new(),
            all_leaf_children: Vec::new(),
        }
    }

    /// Creates a group node. Legacy nested-data groups carry the user
    /// payload that declared them; synthetic groups pass `None`.
    pub fn new_group(id: RowId, key: Option<String>, data: Option<T>, level: i32) -> Self {
        RowNode {
            id,
            key,
            data,
            level,
            parent: None,
            group: true,
            master: false,
            leaf: false,
            expanded: false,
            selected: SelectionState::NotSelected,
            selectable: true,
            row_height: None,
            row_index: None,
            row_top: None,
            children_after_group: Vec::new(),
            children_after_filter: Vec::new(),
            children_after_sort: Vec::new(),
            all_leaf_children: Vec::new(),
        }
    }

    /// A node can be toggled open when it is a group with children or a
    /// master row.
    pub fn is_expandable(&self) -> bool {
        (self.group && !self.children_after_group.is_empty()) || self.master
    }

    /// True when this node currently appears in the display list.
    pub fn is_displayed(&self) -> bool {
        self.row_index.is_some()
    }

    /// Clears the display position assigned by the flatten stage.
    pub fn clear_display_position(&mut self) {
        self.row_index = None;
        self.row_top = None;
    }
}

// ============================================================================
// TESTS
// ============================================================================
