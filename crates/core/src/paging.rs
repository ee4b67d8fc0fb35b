//! Page requests and the deterministic orderings used by comment listings.
//!
//! Top-level comments are listed newest first, replies oldest first. Both
//! orderings break `created_at` ties on `id` so that repeated reads of an
//! unchanged store return identical pages.

use std::cmp::Ordering;

use crate::policy::CommentPolicy;
use crate::types::{DbId, Timestamp};

/// A zero-based page of at most `page_size` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Build a page request, clamping negative pages to 0 and sizes to at least 1.
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.max(0),
            page_size: page_size.max(1),
        }
    }

    /// Build a page request from optional query parameters.
    ///
    /// A missing size uses the policy default; oversized requests are capped
    /// at the policy maximum.
    pub fn from_query(page: Option<i64>, page_size: Option<i64>, policy: &CommentPolicy) -> Self {
        let size = page_size
            .unwrap_or(policy.default_page_size)
            .clamp(1, policy.max_page_size);
        Self::new(page.unwrap_or(0), size)
    }

    /// SQL `OFFSET`.
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.page_size)
    }

    /// SQL `LIMIT`.
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Slice an already ordered list down to this page.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// Direction of a comment listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadOrder {
    /// `created_at DESC, id DESC` (top-level comments).
    NewestFirst,
    /// `created_at ASC, id ASC` (replies).
    OldestFirst,
}

impl ThreadOrder {
    /// Compare two `(created_at, id)` keys in this order.
    pub fn compare(self, a: (Timestamp, DbId), b: (Timestamp, DbId)) -> Ordering {
        match self {
            ThreadOrder::NewestFirst => b.cmp(&a),
            ThreadOrder::OldestFirst => a.cmp(&b),
        }
    }

    /// SQL `ORDER BY` clause for this order.
    pub fn sql(self) -> &'static str {
        match self {
            ThreadOrder::NewestFirst => "created_at DESC, id DESC",
            ThreadOrder::OldestFirst => "created_at ASC, id ASC",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64) -> Timestamp {
        chrono::Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_negative_page_clamped_to_zero() {
        let page = PageRequest::new(-3, 10);
        assert_eq!(page.page, 0);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_zero_page_size_clamped_to_one() {
        assert_eq!(PageRequest::new(0, 0).limit(), 1);
    }

    #[test]
    fn test_from_query_uses_policy_defaults() {
        let policy = CommentPolicy::default();
        let page = PageRequest::from_query(None, None, &policy);
        assert_eq!(page, PageRequest::new(0, policy.default_page_size));
    }

    #[test]
    fn test_from_query_caps_page_size() {
        let policy = CommentPolicy::default();
        let page = PageRequest::from_query(Some(2), Some(10_000), &policy);
        assert_eq!(page.page_size, policy.max_page_size);
        assert_eq!(page.offset(), 2 * policy.max_page_size);
    }

    #[test]
    fn test_apply_slices_requested_page() {
        let items: Vec<i32> = (0..25).collect();
        assert_eq!(PageRequest::new(0, 10).apply(items.clone()), (0..10).collect::<Vec<_>>());
        assert_eq!(PageRequest::new(2, 10).apply(items.clone()), (20..25).collect::<Vec<_>>());
        assert!(PageRequest::new(3, 10).apply(items).is_empty());
    }

    #[test]
    fn test_newest_first_breaks_ties_by_id_descending() {
        let mut keys = vec![(ts(10), 1), (ts(20), 2), (ts(10), 3)];
        keys.sort_by(|a, b| ThreadOrder::NewestFirst.compare(*a, *b));
        assert_eq!(keys, vec![(ts(20), 2), (ts(10), 3), (ts(10), 1)]);
    }

    #[test]
    fn test_oldest_first_breaks_ties_by_id_ascending() {
        let mut keys = vec![(ts(10), 3), (ts(5), 2), (ts(10), 1)];
        keys.sort_by(|a, b| ThreadOrder::OldestFirst.compare(*a, *b));
        assert_eq!(keys, vec![(ts(5), 2), (ts(10), 1), (ts(10), 3)]);
    }
}
