use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use tracing::instrument;

use health_manager_domain::auth::UserInfo;
use health_manager_domain::entities::{HealthTrendPoint, TrendQuery};
use health_manager_domain::errors::{AppError, ErrorResponse};
use health_manager_domain::services::trends::DEFAULT_TREND_DAYS;

use crate::api::state::AppState;

/// Daily BMI, health score and exercise score
#[utoipa::path(
    get,
    path = "/api/v1/trends",
    params(TrendQuery),
    responses(
        (status = 200, description = "One point per day with data, oldest first", body = [HealthTrendPoint]),
        (status = 400, description = "days outside 1-90", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Trends"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn health_trends(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<Vec<HealthTrendPoint>>, AppError> {
    let profile = state.users.find_by_id(&user.user_id).await?;
    let records = state.health_data.all_records(&user.user_id).await?;

    let points = state.trends.daily_trends(
        &records,
        query.days.unwrap_or(DEFAULT_TREND_DAYS),
        Utc::now().date_naive(),
        profile.height_cm,
    )?;
    Ok(Json(points))
}
