//! Query Builder pagination operations

use super::builder::QueryBuilder;

impl<M> QueryBuilder<M> {
    /// Add LIMIT clause
    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    /// Add OFFSET clause. Only emitted together with a LIMIT.
    pub fn offset(mut self, count: u64) -> Self {
        self.offset = Some(count);
        self
    }

    /// Limit to one page; pages start at 1 and anything lower means page 1.
    /// An offset past `i64::MAX` is clamped there, which selects no rows.
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        let offset = page_offset(page, per_page).unwrap_or(MAX_OFFSET);
        self.limit(per_page).offset(offset)
    }
}

// Both backends read LIMIT/OFFSET as signed 64-bit integers
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Row offset of `page`, or `None` when it does not fit in a signed 64-bit OFFSET
pub(crate) fn page_offset(page: u64, per_page: u64) -> Option<u64> {
    (page.max(1) - 1)
        .checked_mul(per_page)
        .filter(|offset| *offset <= MAX_OFFSET)
}
