use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use health_manager_domain::entities::HealthRecord;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Position of a page within a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    /// Total number of items
    pub total: usize,
    /// 1-based page number
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    /// URL of the next page, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// URL of the previous page, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

impl Pagination {
    /// Page metadata for `offset`/`limit` over `total` items.
    /// `link` builds the URL of the page starting at the given offset.
    pub fn new(total: usize, offset: usize, limit: usize, link: impl Fn(usize) -> String) -> Self {
        let per_page = limit.max(1);
        let next = (offset + per_page < total).then(|| link(offset + per_page));
        let prev = (offset > 0).then(|| link(offset.saturating_sub(per_page)));

        Self {
            total,
            page: offset / per_page + 1,
            per_page,
            total_pages: total.div_ceil(per_page),
            next,
            prev,
        }
    }
}

/// Paginated response envelope
#[derive(Debug, Serialize, ToSchema)]
#[aliases(HealthRecordPage = PaginatedResponse<HealthRecord>)]
pub struct PaginatedResponse<T> {
    /// Items of this page
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Page size from an optional `limit`, defaulting to 20 and capped at 100
pub fn page_size(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}
