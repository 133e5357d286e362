use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};

use health_manager_domain::auth::UserInfo;
use health_manager_domain::entities::{CreateHealthRecordRequest, HealthRecord, HealthRecordQuery};
use health_manager_domain::errors::{AppError, ErrorResponse};
use health_manager_domain::services::RecordOutcome;

use crate::api::state::AppState;
use crate::entities::common::HealthRecordPage;
use crate::entities::{page_size, Pagination, PaginatedResponse};

const BASE_URL: &str = "/api/v1/health-records";

/// URL of the listing page at `offset`, keeping the caller's filters
fn page_link(query: &HealthRecordQuery, limit: usize, offset: usize) -> String {
    let mut parts = Vec::new();
    if let Some(metric_type) = query.metric_type {
        parts.push(format!("metric_type={}", metric_type.as_str()));
    }
    if let Some(start) = &query.start_date {
        parts.push(format!("start_date={}", urlencoding::encode(start)));
    }
    if let Some(end) = &query.end_date {
        parts.push(format!("end_date={}", urlencoding::encode(end)));
    }
    if let Some(sort_desc) = query.sort_desc {
        parts.push(format!("sort_desc={}", sort_desc));
    }
    parts.push(format!("limit={}", limit));
    parts.push(format!("offset={}", offset));

    format!("{}?{}", BASE_URL, parts.join("&"))
}

/// Record a measurement and run the alert rules on it
#[utoipa::path(
    post,
    path = "/api/v1/health-records",
    request_body = CreateHealthRecordRequest,
    responses(
        (status = 201, description = "Record stored, with any alerts it raised", body = RecordOutcome),
        (status = 400, description = "Invalid record", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Health records"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn create_health_record(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<CreateHealthRecordRequest>,
) -> Result<(StatusCode, Json<RecordOutcome>), AppError> {
    let outcome = state.health_data.record(&user.user_id, request).await?;
    info!(
        "Record {} created with {} alert(s)",
        outcome.record.id,
        outcome.alerts.len()
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// The caller's records, newest first by default
#[utoipa::path(
    get,
    path = "/api/v1/health-records",
    params(HealthRecordQuery),
    responses(
        (status = 200, description = "A page of records", body = HealthRecordPage),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Health records"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_health_records(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(mut query): Query<HealthRecordQuery>,
) -> Result<Json<PaginatedResponse<HealthRecord>>, AppError> {
    let limit = page_size(query.limit);
    let offset = query.offset.unwrap_or(0);
    query.limit = Some(limit);
    query.offset = Some(offset);

    let (records, total) = state.health_data.list(&user.user_id, query.clone()).await?;
    let pagination = Pagination::new(total, offset, limit, |page_offset| page_link(&query, limit, page_offset));

    Ok(Json(PaginatedResponse {
        data: records,
        pagination,
    }))
}

/// One of the caller's records
#[utoipa::path(
    get,
    path = "/api/v1/health-records/{id}",
    params(("id" = String, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record found", body = HealthRecord),
        (status = 404, description = "No such record for this user", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Health records"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_health_record(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<Json<HealthRecord>, AppError> {
    Ok(Json(state.health_data.get(&user.user_id, &id).await?))
}

/// Delete one of the caller's records
#[utoipa::path(
    delete,
    path = "/api/v1/health-records/{id}",
    params(("id" = String, Path, description = "Record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "No such record for this user", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Health records"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_health_record(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.health_data.delete(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use health_manager_domain::entities::HealthMetricType;

    #[test]
    fn test_page_link_keeps_filters() {
        let query = HealthRecordQuery {
            metric_type: Some(HealthMetricType::HeartRate),
            start_date: Some("2024-03-01T00:00:00+01:00".to_string()),
            ..HealthRecordQuery::default()
        };

        assert_eq!(
            page_link(&query, 20, 40),
            "/api/v1/health-records?metric_type=HEART_RATE&start_date=2024-03-01T00%3A00%3A00%2B01%3A00&limit=20&offset=40"
        );
    }
}
