//! Keyset pagination shared by the course and video browsers.

use serde::{Deserialize, Serialize};

/// Rows of item buttons shown on one page, excluding the navigation row.
pub const PAGE_ROWS: usize = 9;

/// Direction of a page request relative to its pivot id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pivot {
    /// Items with keys greater than or equal to the pivot.
    Up,
    /// Items with keys less than or equal to the pivot.
    Down,
}

/// One page of an ordered listing. `items` is always ascending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_before: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_before: false,
            has_next: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn page_limit(columns: usize) -> usize {
    columns * PAGE_ROWS
}
