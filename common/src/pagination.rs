use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Offset/limit window over an append-ordered listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Clamp the window to `max` items and slice `items` with it.
    /// Out of range offsets give an empty page.
    pub fn slice<'a, T>(&self, items: &'a [T], max: usize) -> &'a [T] {
        let limit = self.limit.min(max).min(MAX_PAGE_SIZE);
        let start = self.offset.min(items.len());
        let end = start.saturating_add(limit).min(items.len());
        &items[start..end]
    }
}
