//! Page-based pagination for the list endpoints (projects, jobs).

use serde::{Deserialize, Serialize};

/// Pagination query parameters. Out-of-range values are clamped rather
/// than rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    const MAX_PER_PAGE: i64 = 100;
    const DEFAULT_PER_PAGE: i64 = 20;

    /// One-based page number.
    pub fn page_number(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page_number() - 1) * self.limit()
    }
}

/// Paged result envelope returned by list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T: Serialize> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: &Pagination) -> Self {
        let per_page = pagination.limit();
        Self {
            items,
            total,
            page: pagination.page_number(),
            per_page,
            total_pages: (total + per_page - 1) / per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination(page: Option<i64>, per_page: Option<i64>) -> Pagination {
        Pagination { page, per_page }
    }

    #[test]
    fn defaults() {
        let p = pagination(None, None);
        assert_eq!(p.page_number(), 1);
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(pagination(Some(1), Some(500)).limit(), 100);
        assert_eq!(pagination(Some(1), Some(0)).limit(), 1);
        assert_eq!(pagination(Some(-3), None).page_number(), 1);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        assert_eq!(pagination(Some(3), Some(10)).offset(), 20);
        assert_eq!(pagination(Some(1), Some(10)).offset(), 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = pagination(Some(1), Some(10));
        let result = PagedResult::new(vec![1, 2, 3], 25, &p);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.total, 25);
        assert_eq!(result.page, 1);
        assert_eq!(result.per_page, 10);
    }
}
