//! Paging types for transaction history queries

use serde::{Deserialize, Serialize};

/// Default page size used by history queries
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Sort direction by transaction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Page request: zero-based page index, page size and time ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
    pub order: SortOrder,
}

impl PageRequest {
    /// Newest-first page, the order history is shown in
    ///
    /// A zero size is bumped to one so paging arithmetic never divides by zero.
    pub fn newest_first(page: usize, size: usize) -> Self {
        Self {
            page,
            size: size.max(1),
            order: SortOrder::Descending,
        }
    }

    /// Index of the first item on this page
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::newest_first(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the totals needed to page further
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    /// Slice an already ordered collection according to `request`
    pub fn from_ordered(all: Vec<T>, request: &PageRequest) -> Self {
        let total_items = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .collect();

        Page {
            items,
            page: request.page,
            size: request.size,
            total_items,
        }
    }

    /// Number of pages needed for all items
    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            0
        } else {
            self.total_items.div_ceil(self.size)
        }
    }

    /// Transform the items, keeping the paging totals
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
        }
    }
}
