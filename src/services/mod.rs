//! Business operations over a borrowed SQLite connection.
//!
//! Handlers lock the shared [`crate::db::Database`] and call into these
//! functions; anything needing atomicity takes `&mut Connection` and opens
//! its own transaction.

use serde_json::Value;

pub mod announcements;
pub mod appearance;
pub mod auth;
pub mod education;
pub mod feedback;
pub mod notifications;
pub mod onboarding;
pub mod password_reset;
pub mod portfolios;
pub mod reference;
pub mod scorecards;
pub mod submissions;
pub mod templates;
pub mod uploads;
pub mod users;

/// JSON column value, with explicit nulls stored as SQL NULL
pub(crate) fn json_param(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Page window for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    /// Out-of-range values fall back to page 1 and the default limit
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64, max_limit: i64) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = limit.filter(|l| (1..=max_limit).contains(l)).unwrap_or(default_limit);
        Page { page, limit }
    }

    /// Saturates for absurd page numbers, which simply yield an empty page
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        assert_eq!(Page::new(None, None, 10, 50), Page { page: 1, limit: 10 });
        assert_eq!(Page::new(Some(0), Some(51), 10, 50), Page { page: 1, limit: 10 });
        assert_eq!(Page::new(Some(3), Some(5), 10, 50).offset(), 10);
    }

    #[test]
    fn test_offset_saturates_for_huge_pages() {
        let page = Page::new(Some(i64::MAX), Some(50), 10, 50);
        assert_eq!(page.page, i64::MAX);
        assert_eq!(page.offset(), i64::MAX);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Page::new(None, Some(10), 10, 50);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(10), 1);
        assert_eq!(page.total_pages(11), 2);
    }
}
