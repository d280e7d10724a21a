//! FILENAME: core/row-engine/src/lib.rs
//! Client-side row pipeline - filter, sort and flatten over the node tree.
//!
//! This crate layers the display pipeline on top of the identity layer in
//! `grid-model`. The [`model::RowModel`] orchestrates everything: row data
//! goes in through full loads or transactions, runs through grouping
//! (installed stage or passthrough), filtering, optional pivot and
//! aggregation stages, sorting and flattening, and comes out as a linear
//! list of displayed rows with pixel positions. Hosts feed it sort models,
//! filter criteria, expansion toggles and height callbacks, and listen on
//! the event bus for the resulting updates.

pub mod changed_path;
pub mod criteria;
pub mod definition;
pub mod display;
pub mod field;
pub mod filter;
pub mod flatten;
pub mod model;
pub mod sort;
pub mod stage;

pub use changed_path::ChangedPath;
pub use criteria::{ColumnFilterModel, FilterCriteria, FilterOperator};
pub use definition::{
    GroupFilterPolicy, RowModelConfig, SortDirection, SortModel, SortModelItem,
    DEFAULT_ASYNC_WAIT_MILLIS, DEFAULT_ROW_HEIGHT,
};
pub use display::DisplayedRows;
pub use field::{FieldGetter, FieldRegistry, FieldValue};
pub use filter::{CriteriaEvaluator, FilterEvaluator};
pub use flatten::RowHeightCallback;
pub use model::{RefreshParams, RefreshStep, RowModel, TransactionCallback, STEP_ORDER};
pub use sort::{ComparatorRegistry, RowComparator};
pub use stage::{passthrough_group, RowNodeStage};
