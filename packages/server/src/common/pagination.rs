//! Page-number pagination.
//!
//! # Usage
//!
//! ```rust,ignore
//! let params = PageParams::new(query.page, query.per_page);
//! let (users, total) = User::search(q, sort, &params, pool).await?;
//! let page = Page::new(users, &params, total);
//! ```

use serde::Serialize;

pub const DEFAULT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 100;

/// Validated page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub per_page: i64,
}

impl PageParams {
    /// Clamp raw query values into a usable request.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    /// Saturates for absurd page numbers, which then read as an empty page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus navigation hints.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_num: Option<i64>,
    pub prev_num: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, params: &PageParams, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + params.per_page - 1) / params.per_page
        };
        let has_next = params.page < pages;
        let has_prev = params.page > 1;

        Self {
            items,
            page: params.page,
            per_page: params.per_page,
            total,
            pages,
            has_next,
            has_prev,
            next_num: has_next.then_some(params.page + 1),
            prev_num: has_prev.then_some(params.page - 1),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            pages: self.pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
            next_num: self.next_num,
            prev_num: self.prev_num,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_clamp_bad_input() {
        let params = PageParams::new(Some(0), Some(10_000));
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, MAX_PER_PAGE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn offset_follows_page() {
        let params = PageParams::new(Some(3), Some(20));
        assert_eq!(params.offset(), 40);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let params = PageParams::new(Some(i64::MAX), Some(MAX_PER_PAGE));
        assert_eq!(params.offset(), i64::MAX);

        let page = Page::new(Vec::<i32>::new(), &params, 3);
        assert!(!page.has_next);
        assert_eq!(page.prev_num, Some(i64::MAX - 1));
    }

    #[test]
    fn middle_page_links_both_ways() {
        let params = PageParams::new(Some(2), Some(10));
        let page = Page::new(vec![1, 2, 3], &params, 25);

        assert_eq!(page.pages, 3);
        assert!(page.has_next);
        assert!(page.has_prev);
        assert_eq!(page.next_num, Some(3));
        assert_eq!(page.prev_num, Some(1));
    }

    #[test]
    fn empty_result_has_no_links() {
        let page: Page<i32> = Page::new(vec![], &PageParams::default(), 0);
        assert_eq!(page.pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_prev);
        assert_eq!(page.next_num, None);
    }
}
