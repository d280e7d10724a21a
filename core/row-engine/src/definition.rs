//! FILENAME: core/row-engine/src/definition.rs
//! Row model configuration - the serializable state.
//!
//! This module contains the types that DESCRIBE how the pipeline should
//! behave: the sort model, the grouping/filtering switches and the sizing
//! defaults. Everything here is plain data that a host can persist and
//! restore; the callbacks that read the opaque payload live with the node
//! manager and the field registry instead.

use serde::{Deserialize, Serialize};

/// Row height in pixels when neither the node nor the host callback
/// provides one.
pub const DEFAULT_ROW_HEIGHT: f64 = 25.0;

/// Default wait window for batched transactions, in milliseconds.
pub const DEFAULT_ASYNC_WAIT_MILLIS: u64 = 50;

// ============================================================================
// SORT MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Ascending
    }
}

/// One entry of the ordered sort model. Comparators are registered
/// separately by column id (they are not serializable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortModelItem {
    pub col_id: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortModelItem {
    pub fn new(col_id: impl Into<String>, direction: SortDirection) -> Self {
        SortModelItem {
            col_id: col_id.into(),
            direction,
        }
    }

    pub fn ascending(col_id: impl Into<String>) -> Self {
        Self::new(col_id, SortDirection::Ascending)
    }

    pub fn descending(col_id: impl Into<String>) -> Self {
        Self::new(col_id, SortDirection::Descending)
    }
}

/// The active multi-key sort, highest priority first.
pub type SortModel = Vec<SortModelItem>;

// ============================================================================
// FILTER POLICY
// ============================================================================

/// How group rows interact with active filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupFilterPolicy {
    /// A group survives filtering when at least one descendant does.
    ByChildren,
    /// A group survives when a descendant does, or when its own values
    /// pass the filters.
    SelfAndChildren,
}

impl Default for GroupFilterPolicy {
    fn default() -> Self {
        GroupFilterPolicy::ByChildren
    }
}

// ============================================================================
// MODEL CONFIG
// ============================================================================

/// Construction-time configuration of the row model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowModelConfig {
    /// Fallback row height in pixels.
    pub default_row_height: f64,
    /// Groups at levels below this threshold start expanded; -1 expands
    /// every level.
    pub group_default_expanded: i32,
    /// Wait window for batched async transactions, in milliseconds.
    pub async_transaction_wait_millis: u64,
    /// Group inclusion policy under active filters.
    pub group_filter_policy: GroupFilterPolicy,
    /// Whether surviving group rows are selectable at all.
    pub groups_selectable: bool,
}

impl Default for RowModelConfig {
    fn default() -> Self {
        RowModelConfig {
            default_row_height: DEFAULT_ROW_HEIGHT,
            group_default_expanded: 0,
            async_transaction_wait_millis: DEFAULT_ASYNC_WAIT_MILLIS,
            group_filter_policy: GroupFilterPolicy::ByChildren,
            groups_selectable: true,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
