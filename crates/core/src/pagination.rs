//! Page-number pagination: defaults, clamps and page arithmetic.
//!
//! Defaults are applied *before* validation. Because every page `<= 0` is
//! coerced to 1 and every limit `<= 0` to [`DEFAULT_LIMIT`], the negative
//! and oversized rejection paths in [`PageRequest::validate`] are not
//! reachable through [`PageRequest::resolve`]; they only guard requests
//! built without defaults.

use serde::Serialize;

use crate::error::CoreError;

/// Page returned when none (or a non-positive one) is requested.
pub const DEFAULT_PAGE: i64 = 1;

/// Page size used when none (or a non-positive one) is requested.
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page size; larger requests are clamped to this.
pub const MAX_LIMIT: i64 = 100;

pub const INVALID_PAGINATION: &str = "invalid pagination parameters";
pub const LIMIT_TOO_LARGE: &str = "limit cannot exceed 100";

/// A requested page, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Build a raw request from optional query values. Missing values become
    /// 0 so that defaulting treats them like an explicit zero.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(0),
            limit: limit.unwrap_or(0),
        }
    }

    /// Apply defaults and the page-size clamp.
    pub fn apply_defaults(self) -> Self {
        let page = if self.page <= 0 { DEFAULT_PAGE } else { self.page };
        let limit = if self.limit <= 0 {
            DEFAULT_LIMIT
        } else {
            self.limit.min(MAX_LIMIT)
        };
        Self { page, limit }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.page < 0 || self.limit < 0 {
            return Err(CoreError::Validation(INVALID_PAGINATION.to_string()));
        }
        if self.limit > MAX_LIMIT {
            return Err(CoreError::Validation(LIMIT_TOO_LARGE.to_string()));
        }
        Ok(())
    }

    /// Defaults first, then validation on the defaulted values.
    pub fn resolve(page: Option<i64>, limit: Option<i64>) -> Result<Self, CoreError> {
        let request = Self::new(page, limit).apply_defaults();
        request.validate()?;
        Ok(request)
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit)
    }
}

/// Number of pages needed to show `total` rows, `ceil(total / limit)`.
///
/// Zero rows means zero pages.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// One page of results plus the numbers needed to render a pager.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            total_pages: total_pages(total, request.limit),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    // -- apply_defaults ------------------------------------------------------

    #[test]
    fn missing_values_use_defaults() {
        let req = PageRequest::resolve(None, None).unwrap();
        assert_eq!(req, PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn zero_and_negative_page_default_to_one() {
        assert_eq!(PageRequest::resolve(Some(0), Some(5)).unwrap().page, 1);
        assert_eq!(PageRequest::resolve(Some(-7), Some(5)).unwrap().page, 1);
    }

    #[test]
    fn zero_and_negative_limit_default_to_ten() {
        assert_eq!(PageRequest::resolve(Some(1), Some(0)).unwrap().limit, 10);
        assert_eq!(PageRequest::resolve(Some(1), Some(-3)).unwrap().limit, 10);
    }

    #[test]
    fn limit_101_is_clamped_and_passes_validation() {
        let req = PageRequest::resolve(Some(1), Some(101)).unwrap();
        assert_eq!(req.limit, 100);
    }

    #[test]
    fn limit_100_passes_through() {
        assert_eq!(PageRequest::resolve(Some(2), Some(100)).unwrap().limit, 100);
    }

    // -- validate ------------------------------------------------------------

    // These paths cannot be reached through `resolve`; they are pinned here so
    // a change in ordering shows up as a test failure.

    #[test]
    fn validate_rejects_negative_values_without_defaults() {
        let req = PageRequest { page: -1, limit: 10 };
        assert_matches!(req.validate(), Err(CoreError::Validation(msg)) if msg == INVALID_PAGINATION);

        let req = PageRequest { page: 1, limit: -1 };
        assert_matches!(req.validate(), Err(CoreError::Validation(msg)) if msg == INVALID_PAGINATION);
    }

    #[test]
    fn validate_rejects_oversized_limit_without_defaults() {
        let req = PageRequest { page: 1, limit: 101 };
        assert_matches!(req.validate(), Err(CoreError::Validation(msg)) if msg == LIMIT_TOO_LARGE);
    }

    // -- offset --------------------------------------------------------------

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(PageRequest { page: 1, limit: 10 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, limit: 10 }.offset(), 20);
    }

    #[test]
    fn offset_saturates_on_huge_pages() {
        assert_eq!(PageRequest { page: i64::MAX, limit: 100 }.offset(), i64::MAX);
    }

    // -- total_pages ---------------------------------------------------------

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(30, 10), 3);
        assert_eq!(total_pages(1, 100), 1);
    }

    #[test]
    fn total_pages_for_empty_table_is_zero() {
        assert_eq!(total_pages(0, 10), 0);
    }

    #[test]
    fn paginated_result_carries_request_numbers() {
        let req = PageRequest { page: 3, limit: 10 };
        let result = PaginatedResult::new(vec![1, 2, 3, 4, 5], 25, req);
        assert_eq!(result.page, 3);
        assert_eq!(result.limit, 10);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.items.len(), 5);
    }
}
