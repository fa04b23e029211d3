//! Pagination for sentence listings
//!
//! Pages are 1-indexed. Requests past the last page are not clamped: they
//! yield an empty item list alongside the real totals.

use serde::Serialize;

/// Page size used when none is requested
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Largest page size a client may ask for
pub const MAX_PER_PAGE: i64 = 50;

/// Sanitized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Clamp `page` to at least 1 and `per_page` into `[1, MAX_PER_PAGE]`
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    /// Offset for SQL LIMIT/OFFSET query
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination metadata returned with every listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total = total.max(0);
        let pages = ((total + request.per_page - 1) / request.per_page).max(1);
        Self {
            page: request.page,
            per_page: request.per_page,
            total,
            pages,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

/// One page of items
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Convert the items while keeping the pagination metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let r = PageRequest::default();
        assert_eq!(r.page, 1);
        assert_eq!(r.per_page, 20);
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn test_request_clamping() {
        let r = PageRequest::new(Some(0), Some(500));
        assert_eq!(r.page, 1);
        assert_eq!(r.per_page, 50);

        let r = PageRequest::new(Some(-3), Some(0));
        assert_eq!(r.page, 1);
        assert_eq!(r.per_page, 1);
    }

    #[test]
    fn test_offset() {
        let r = PageRequest::new(Some(3), Some(20));
        assert_eq!(r.offset(), 40);
    }

    #[test]
    fn test_pages_rounds_up() {
        let p = Pagination::new(PageRequest::new(Some(1), Some(20)), 41);
        assert_eq!(p.pages, 3);
        assert!(p.has_next());
        assert!(!p.has_prev());
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let p = Pagination::new(PageRequest::default(), 0);
        assert_eq!(p.pages, 1);
        assert_eq!(p.total, 0);
        assert!(!p.has_next());
    }

    #[test]
    fn test_page_past_end_is_kept() {
        let p = Pagination::new(PageRequest::new(Some(9), Some(20)), 25);
        assert_eq!(p.page, 9);
        assert_eq!(p.pages, 2);
        assert!(p.has_prev());
        assert!(!p.has_next());
    }

    #[test]
    fn test_exact_boundary() {
        let p = Pagination::new(PageRequest::new(Some(2), Some(50)), 100);
        assert_eq!(p.pages, 2);
        assert!(!p.has_next());
    }
}
