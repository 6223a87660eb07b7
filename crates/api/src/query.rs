//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Page-number pagination parameters (`?page=&limit=`).
///
/// Missing or non-positive values are defaulted and oversized limits
/// clamped in the service layer via `PageRequest::resolve`.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
