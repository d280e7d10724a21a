//! FILENAME: core/row-engine/src/display.rs
//! Displayed-row view - the linear index over the flattened tree.
//!
//! The flatten step produces one of these per refresh: the visible row
//! keys in display order, each row's top offset in pixels, and the total
//! pixel height. Lookups by index and by pixel run against this view
//! without touching the tree.

use grid_model::NodeKey;

// ============================================================================
// DISPLAYED ROWS
// ============================================================================

/// Visible rows in display order with their vertical pixel layout.
/// `tops` is parallel to `keys` and monotonically non-decreasing.
#[derive(Debug, Clone, Default)]
pub struct DisplayedRows {
    keys: Vec<NodeKey>,
    tops: Vec<f64>,
    total_height: f64,
}

impl DisplayedRows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(mut keys: Vec<NodeKey>, mut tops: Vec<f64>, total_height: f64) -> Self {
        // The lists are built in lockstep; trim defensively so the
        // parallel-array invariant holds regardless.
        let len = keys.len().min(tops.len());
        keys.truncate(len);
        tops.truncate(len);
        DisplayedRows {
            keys,
            tops,
            total_height,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[NodeKey] {
        &self.keys
    }

    pub fn key_at(&self, index: usize) -> Option<NodeKey> {
        self.keys.get(index).copied()
    }

    pub fn top_of(&self, index: usize) -> Option<f64> {
        self.tops.get(index).copied()
    }

    pub fn total_height(&self) -> f64 {
        self.total_height
    }

    /// `(top, height)` of the row at `index`. The last row's height runs
    /// to the total height.
    pub fn row_bounds(&self, index: usize) -> Option<(f64, f64)> {
        let top = self.top_of(index)?;
        let bottom = match self.tops.get(index + 1) {
            Some(&next_top) => next_top,
            None => self.total_height,
        };
        Some((top, bottom - top))
    }

    /// Display index of the row covering `pixel`. Out-of-range pixels
    /// clamp to the first or last row; an empty view answers 0.
    pub fn index_at_pixel(&self, pixel: f64) -> usize {
        if self.keys.is_empty() {
            return 0;
        }
        let last = self.keys.len() - 1;
        if pixel <= 0.0 {
            return 0;
        }
        if pixel >= self.total_height {
            return last;
        }

        let mut low = 0usize;
        let mut high = last;
        // Ascending tops guarantee termination; the counter guards
        // against degenerate zero-height layouts.
        let mut remaining = self.keys.len() + 1;
        while remaining > 0 {
            remaining -= 1;
            let mid = (low + high) / 2;
            let top = self.tops[mid];
            let bottom = match self.tops.get(mid + 1) {
                Some(&next_top) => next_top,
                None => self.total_height,
            };
            if pixel >= top && pixel < bottom {
                return mid;
            }
            if top < pixel {
                low = mid + 1;
            } else if mid > 0 {
                high = mid - 1;
            } else {
                return 0;
            }
        }
        low.min(last)
    }
}

// ============================================================================
// TESTS
// ============================================================================
