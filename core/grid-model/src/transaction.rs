//! FILENAME: core/grid-model/src/transaction.rs
//! PURPOSE: Delta-update types for the row model.
//! CONTEXT: A `RowDataTransaction` describes an incremental change to the
//! row set (add / update / remove) without replacing the whole data array.
//! The node manager resolves it against the id index and answers with a
//! `TransactionResult` so the host can patch its UI incrementally instead
//! of redrawing everything.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::node::{NodeKey, RowId, RowNode};

// ============================================================================
// TRANSACTION
// ============================================================================

/// One delta update. All sections are optional; an empty transaction is
/// legal and applies as a no-op pipeline pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowDataTransaction<T> {
    /// Rows to create at top level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add: Option<Vec<T>>,
    /// Insertion position for `add` within the leaf list. Appended when
    /// absent. Items keep their input order at the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_index: Option<usize>,
    /// Rows whose payload replaces the payload of the matching node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Vec<T>>,
    /// Rows whose matching nodes are removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<T>>,
}

impl<T> Default for RowDataTransaction<T> {
    fn default() -> Self {
        RowDataTransaction {
            add: None,
            add_index: None,
            update: None,
            remove: None,
        }
    }
}

impl<T> RowDataTransaction<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_add(mut self, rows: Vec<T>) -> Self {
        self.add = Some(rows);
        self
    }

    pub fn with_add_index(mut self, index: usize) -> Self {
        self.add_index = Some(index);
        self
    }

    pub fn with_update(mut self, rows: Vec<T>) -> Self {
        self.update = Some(rows);
        self
    }

    pub fn with_remove(mut self, rows: Vec<T>) -> Self {
        self.remove = Some(rows);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_none() && self.update.is_none() && self.remove.is_none()
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// What a transaction actually changed.
///
/// Added and updated rows are reported by id and stay queryable through
/// the model; removed rows no longer live in the arena, so their nodes are
/// handed back by value (with selection already cleared).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult<T> {
    pub add: Vec<RowId>,
    pub update: Vec<RowId>,
    pub remove: Vec<RowNode<T>>,
}

impl<T> Default for TransactionResult<T> {
    fn default() -> Self {
        TransactionResult {
            add: Vec::new(),
            update: Vec::new(),
            remove: Vec::new(),
        }
    }
}

impl<T> TransactionResult<T> {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }

    /// Total number of affected rows across all three sections.
    pub fn affected_count(&self) -> usize {
        self.add.len() + self.update.len() + self.remove.len()
    }
}

// ============================================================================
// APPLIED OUTCOME (manager -> orchestrator)
// ============================================================================

/// Internal outcome of applying one transaction: the public result plus
/// the bookkeeping the orchestrator needs to scope the refresh and batch
/// selection events.
#[derive(Debug)]
pub struct TransactionApplied<T> {
    pub result: TransactionResult<T>,
    /// Arena keys of surviving affected nodes (added + updated), used to
    /// seed the change path.
    pub changed_keys: SmallVec<[NodeKey; 8]>,
    /// Parents that lost children, also change-path seeds. Removed nodes
    /// themselves are gone from the arena and cannot be walked.
    pub removed_parents: SmallVec<[NodeKey; 8]>,
    /// Ids of removed rows that were selected at removal time; the
    /// orchestrator folds these into one selection-changed event.
    pub deselected: Vec<RowId>,
}

impl<T> TransactionApplied<T> {
    pub fn new(result: TransactionResult<T>) -> Self {
        TransactionApplied {
            result,
            changed_keys: SmallVec::new(),
            removed_parents: SmallVec::new(),
            deselected: Vec::new(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
