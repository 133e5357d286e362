// Public entities for the HealthManager API
// Response envelopes shared by the handlers; domain types are serialized as-is.

// Pagination
pub mod common;

pub use common::{page_size, Pagination, PaginatedResponse};
