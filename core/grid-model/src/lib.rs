//! FILENAME: core/grid-model/src/lib.rs
//! PURPOSE: Identity layer of the row model.
//! CONTEXT: This crate owns everything about row identity: the `RowNode`
//! record, the arena-backed `RowTree` with its id index, the
//! `RowNodeManager` that builds and patches the tree from user data, the
//! delta-update types and the typed event bus. The pipeline stages that
//! consume the tree (filter, sort, flatten, orchestration) live in the
//! `row-engine` crate on top of this one.

pub mod error;
pub mod events;
pub mod manager;
pub mod node;
pub mod transaction;
pub mod tree;

pub use error::RowDataError;
pub use events::{EventBus, EventTopic, GridEvent, Subscription, SubscriptionId};
pub use manager::{
    GetChildDetailsFn, GetRowIdFn, IsRowMasterFn, NodeChildDetails, RowCallbacks, RowEqFn,
    RowNodeManager,
};
pub use node::{NodeKey, RowId, RowNode, SelectionState, ROOT_LEVEL, ROOT_NODE_ID};
pub use transaction::{RowDataTransaction, TransactionApplied, TransactionResult};
pub use tree::{ChildList, RowTree};

// ============================================================================
// INTEGRATION TESTS
// ============================================================================
