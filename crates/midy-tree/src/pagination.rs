//! One page of a listing.

use serde::Serialize;

use crate::folder::Entry;

/// Paginated listing result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    /// Matching entries before pagination.
    pub total: usize,
    /// Entries per page (at least 1).
    pub page_size: usize,
    /// `ceil(total / page_size)`.
    pub page_count: usize,
    /// 1-based page number.
    pub page_num: usize,
    /// Entries on this page.
    pub items: Vec<Entry>,
}

impl Pagination {
    /// Clamp a requested page number and size to usable values.
    ///
    /// Returns `(page_num, page_size)`, both at least 1.
    #[must_use]
    pub fn normalize(page_num: usize, page_size: usize) -> (usize, usize) {
        (page_num.max(1), page_size.max(1))
    }

    /// Offset of the first entry on `page_num`.
    #[must_use]
    pub fn offset(page_num: usize, page_size: usize) -> usize {
        let (page_num, page_size) = Self::normalize(page_num, page_size);
        (page_num - 1).saturating_mul(page_size)
    }

    #[must_use]
    pub fn new(total: usize, page_num: usize, page_size: usize, items: Vec<Entry>) -> Self {
        let (page_num, page_size) = Self::normalize(page_num, page_size);
        Self {
            total,
            page_size,
            page_count: total.div_ceil(page_size),
            page_num,
            items,
        }
    }

    /// Check whether a later page exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page_num < self.page_count
    }
}
