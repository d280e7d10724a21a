//! FILENAME: core/row-engine/src/criteria.rs
//! Provided column filter model - serializable per-column criteria.
//!
//! This is the out-of-the-box implementation of the filter collaborator:
//! hosts describe what should remain visible per column (a discrete value
//! list, an operator comparison, or both) and the filter stage evaluates
//! rows against it through the field registry. Text comparison is
//! case-insensitive and `*`/`?` wildcards are honoured where text equality
//! is involved.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::field::FieldValue;

// ============================================================================
// OPERATORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEqual,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Blank,
    NotBlank,
}

// ============================================================================
// CRITERIA
// ============================================================================

/// Filter condition for one column. `values` and `operator`/`operand`
/// both apply when both are present (logical AND). A criteria with
/// neither section passes everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    /// Discrete allow-list; a row passes when its value equals any entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<FieldValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<FilterOperator>,
    /// Right-hand side of the operator comparison; carries the wildcard
    /// pattern for text equality.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand: Option<FieldValue>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        FilterCriteria {
            values: None,
            operator: None,
            operand: None,
        }
    }
}

impl FilterCriteria {
    /// Allow-list criteria.
    pub fn in_values(values: Vec<FieldValue>) -> Self {
        FilterCriteria {
            values: Some(values),
            ..Default::default()
        }
    }

    /// Operator criteria. `Blank`/`NotBlank` take no operand.
    pub fn with_operator(operator: FilterOperator, operand: Option<FieldValue>) -> Self {
        FilterCriteria {
            operator: Some(operator),
            operand,
            ..Default::default()
        }
    }

    /// Whether a cell value passes this criteria.
    pub fn matches(&self, value: &FieldValue) -> bool {
        if let Some(allowed) = &self.values {
            let hit = allowed
                .iter()
                .any(|candidate| FieldValue::compare(candidate, value) == std::cmp::Ordering::Equal);
            if !hit {
                return false;
            }
        }
        match self.operator {
            Some(op) => self.matches_operator(op, value),
            None => true,
        }
    }

    fn matches_operator(&self, op: FilterOperator, value: &FieldValue) -> bool {
        use std::cmp::Ordering;

        // Blank checks need no operand.
        match op {
            FilterOperator::Blank => return is_blank(value),
            FilterOperator::NotBlank => return !is_blank(value),
            _ => {}
        }

        // A comparison without an operand cannot reject anything.
        let operand = match &self.operand {
            Some(v) => v,
            None => return true,
        };

        match op {
            FilterOperator::Equals => loose_equals(value, operand),
            FilterOperator::NotEqual => !loose_equals(value, operand),
            FilterOperator::Contains => text_form(value).contains(&text_form(operand)),
            FilterOperator::StartsWith => text_form(value).starts_with(&text_form(operand)),
            FilterOperator::EndsWith => text_form(value).ends_with(&text_form(operand)),
            FilterOperator::GreaterThan => {
                FieldValue::compare(value, operand) == Ordering::Greater
            }
            FilterOperator::GreaterThanOrEqual => {
                FieldValue::compare(value, operand) != Ordering::Less
            }
            FilterOperator::LessThan => FieldValue::compare(value, operand) == Ordering::Less,
            FilterOperator::LessThanOrEqual => {
                FieldValue::compare(value, operand) != Ordering::Greater
            }
            // Handled by the early return above.
            FilterOperator::Blank | FilterOperator::NotBlank => true,
        }
    }
}

fn is_blank(value: &FieldValue) -> bool {
    match value {
        FieldValue::Empty => true,
        FieldValue::Text(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Equality with case-insensitive text and wildcard support when the
/// operand carries `*` or `?`.
fn loose_equals(value: &FieldValue, operand: &FieldValue) -> bool {
    if let FieldValue::Text(pattern) = operand {
        if pattern.contains('*') || pattern.contains('?') {
            return wildcard_match(&text_form(value), &pattern.to_lowercase());
        }
    }
    FieldValue::compare(value, operand) == std::cmp::Ordering::Equal
}

/// Lowercase text rendition used by the text operators, mirroring what a
/// grid displays in the cell.
fn text_form(value: &FieldValue) -> String {
    match value {
        FieldValue::Empty => String::new(),
        FieldValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        FieldValue::Text(text) => text.to_lowercase(),
        FieldValue::Bool(b) => b.to_string(),
    }
}

/// `*` matches any run of characters (including none), `?` exactly one.
fn wildcard_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    wildcard_match_at(&text, 0, &pattern, 0)
}

fn wildcard_match_at(text: &[char], ti: usize, pattern: &[char], pi: usize) -> bool {
    if pi == pattern.len() {
        return ti == text.len();
    }
    match pattern[pi] {
        '*' => {
            // Try every split point, including the empty match.
            for skip in ti..=text.len() {
                if wildcard_match_at(text, skip, pattern, pi + 1) {
                    return true;
                }
            }
            false
        }
        '?' => ti < text.len() && wildcard_match_at(text, ti + 1, pattern, pi + 1),
        ch => ti < text.len() && text[ti] == ch && wildcard_match_at(text, ti + 1, pattern, pi + 1),
    }
}

// ============================================================================
// COLUMN FILTER MODEL
// ============================================================================

/// Active criteria per column id. Empty model = no filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFilterModel {
    filters: FxHashMap<String, FilterCriteria>,
}

impl ColumnFilterModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, col_id: impl Into<String>, criteria: FilterCriteria) {
        self.filters.insert(col_id.into(), criteria);
    }

    /// Returns true when a filter was actually removed.
    pub fn remove(&mut self, col_id: &str) -> bool {
        self.filters.remove(col_id).is_some()
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn get(&self, col_id: &str) -> Option<&FilterCriteria> {
        self.filters.get(col_id)
    }

    pub fn is_active(&self) -> bool {
        !self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterCriteria)> {
        self.filters.iter()
    }
}

// ============================================================================
// TESTS
// ============================================================================
