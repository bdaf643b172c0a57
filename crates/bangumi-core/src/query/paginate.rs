//! # Paginator
//!
//! Fixed-size pages over a result list. Pages are 1-based.

use crate::primitives::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::ExplorerError;
use std::num::NonZeroUsize;

/// Splits a result list into pages of `page_size` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: NonZeroUsize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_size: NonZeroUsize::MIN.saturating_add(DEFAULT_PAGE_SIZE - 1),
        }
    }
}

impl Paginator {
    /// Create a paginator.
    ///
    /// Fails for a page size of 0 or above [`MAX_PAGE_SIZE`].
    pub fn new(page_size: usize) -> Result<Self, ExplorerError> {
        match NonZeroUsize::new(page_size) {
            Some(size) if page_size <= MAX_PAGE_SIZE => Ok(Self { page_size: size }),
            _ => Err(ExplorerError::InvalidValue {
                field: "page size",
                value: page_size.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    /// Number of pages for `total` items; at least 1.
    #[must_use]
    pub fn page_count(&self, total: usize) -> u32 {
        let pages = total.div_ceil(self.page_size.get()).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Clamp a requested page into `[1, page_count]`.
    #[must_use]
    pub fn clamp(&self, page: u32, total: usize) -> u32 {
        page.clamp(1, self.page_count(total))
    }

    /// Item index range of a page after clamping.
    #[must_use]
    pub fn bounds(&self, page: u32, total: usize) -> std::ops::Range<usize> {
        let page = self.clamp(page, total) as usize;
        let size = self.page_size.get();
        let start = (page - 1).saturating_mul(size).min(total);
        let end = start.saturating_add(size).min(total);
        start..end
    }

    /// The items on a page after clamping.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T], page: u32) -> &'a [T] {
        &items[self.bounds(page, items.len())]
    }
}
