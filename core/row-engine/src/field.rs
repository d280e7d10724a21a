//! FILENAME: core/row-engine/src/field.rs
//! Typed field access over the opaque row payload.
//!
//! The pipeline never looks inside the payload type directly. Hosts
//! register one getter per column id; the getter maps a payload reference
//! to a small typed `FieldValue`, and both the sort stage and the provided
//! filter criteria work on those values. The comparison is a total order
//! (numbers, then text, then bools, then empty) so sorting never has to
//! care about mixed-type columns.

use std::cmp::Ordering;

use grid_model::RowNode;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// FIELD VALUE
// ============================================================================

/// A single extracted cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    /// Rank of the value's type in the total order. Empty sorts after
    /// everything so blank cells end up at the bottom in ascending order.
    fn type_rank(&self) -> u8 {
        match self {
            FieldValue::Number(_) => 0,
            FieldValue::Text(_) => 1,
            FieldValue::Bool(_) => 2,
            FieldValue::Empty => 3,
        }
    }

    /// Total-order comparison: values of different types order by type
    /// rank; same-type values compare naturally. Text compares
    /// case-insensitively; NaN compares equal to NaN rather than
    /// poisoning the sort.
    pub fn compare(a: &FieldValue, b: &FieldValue) -> Ordering {
        match (a, b) {
            (FieldValue::Number(x), FieldValue::Number(y)) => {
                x.partial_cmp(y).unwrap_or(Ordering::Equal)
            }
            (FieldValue::Text(x), FieldValue::Text(y)) => {
                x.to_lowercase().cmp(&y.to_lowercase())
            }
            (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
            (FieldValue::Empty, FieldValue::Empty) => Ordering::Equal,
            _ => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

// ============================================================================
// FIELD REGISTRY
// ============================================================================

pub type FieldGetter<T> = Box<dyn Fn(&T) -> FieldValue>;

/// Per-column getters from payload to `FieldValue`, keyed by column id.
pub struct FieldRegistry<T> {
    getters: FxHashMap<String, FieldGetter<T>>,
}

impl<T> FieldRegistry<T> {
    pub fn new() -> Self {
        FieldRegistry {
            getters: FxHashMap::default(),
        }
    }

    pub fn register(&mut self, col_id: impl Into<String>, getter: impl Fn(&T) -> FieldValue + 'static) {
        self.getters.insert(col_id.into(), Box::new(getter));
    }

    pub fn has_field(&self, col_id: &str) -> bool {
        self.getters.contains_key(col_id)
    }

    /// Extracts a column value from a payload. Unknown columns read as
    /// `Empty`.
    pub fn value_of(&self, col_id: &str, data: &T) -> FieldValue {
        match self.getters.get(col_id) {
            Some(getter) => getter(data),
            None => FieldValue::Empty,
        }
    }

    /// Extracts a column value from a node. Data rows go through the
    /// getter; group rows without data expose their group key as text so
    /// groups order and filter by key.
    pub fn node_value(&self, col_id: &str, node: &RowNode<T>) -> FieldValue {
        match &node.data {
            Some(data) => self.value_of(col_id, data),
            None => match &node.key {
                Some(key) => FieldValue::Text(key.clone()),
                None => FieldValue::Empty,
            },
        }
    }
}

impl<T> Default for FieldRegistry<T> {
    fn default() -> Self {
        FieldRegistry::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
