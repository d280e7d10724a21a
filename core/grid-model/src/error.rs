//! FILENAME: core/grid-model/src/error.rs
//! PURPOSE: Typed user-data and configuration errors.
//! CONTEXT: The row model is an embedded library and must not take the
//! host down over bad input. These values are logged through the `log`
//! facade at the point of degradation (skip the item, reject the call)
//! instead of being returned to the caller.

use thiserror::Error;

use crate::node::RowId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowDataError {
    /// A user id function produced an id that is already live. Non-fatal:
    /// both rows exist, the id index keeps the most recent one.
    #[error("duplicate node id '{0}' detected; the id index keeps the most recent row")]
    DuplicateId(RowId),

    /// A transaction item could not be matched to a live node, either by
    /// id or by the row-equality scan. The item is skipped.
    #[error("could not resolve {op} transaction item to a row node; item skipped")]
    UnresolvedItem { op: &'static str },

    /// Incremental transactions are incompatible with nested (legacy
    /// tree) row data; the whole call is rejected.
    #[error("row transactions cannot be applied while nested row data is in use")]
    TransactionWithNestedData,
}
