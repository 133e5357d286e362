use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

use health_manager_domain::auth::UserInfo;
use health_manager_domain::entities::{
    Correlation, DimensionAnalysis, HealthAdvice, HealthMetricType, HealthRecord, RiskAssessment, TrendAnalysis,
};
use health_manager_domain::errors::{AppError, ErrorResponse};

use crate::api::state::AppState;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct TrendParams {
    /// Metric to analyze, e.g. HEART_RATE
    pub metric_type: HealthMetricType,
}

/// Per-metric scores and their weighted total
#[derive(Debug, Serialize, ToSchema)]
pub struct DimensionsResponse {
    /// Weighted mean of the dimension scores, 0-100
    pub overall_score: f64,
    pub dimensions: Vec<DimensionAnalysis>,
}

async fn records_of(state: &AppState, user: &UserInfo) -> Result<Vec<HealthRecord>, AppError> {
    let records = state.health_data.all_records(&user.user_id).await?;
    debug!("Analyzing {} records of user {}", records.len(), user.user_id);
    Ok(records)
}

/// Risk assessment from the latest value of each metric
#[utoipa::path(
    get,
    path = "/api/v1/analysis/risk",
    responses(
        (status = 200, description = "Risk assessment", body = RiskAssessment),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Analysis"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn risk_assessment(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<Json<RiskAssessment>, AppError> {
    let records = records_of(&state, &user).await?;
    Ok(Json(state.analysis.assess_risk(&records)))
}

/// Trend, prediction and seasonality of one metric
#[utoipa::path(
    get,
    path = "/api/v1/analysis/trend",
    params(TrendParams),
    responses(
        (status = 200, description = "Trend analysis", body = TrendAnalysis),
        (status = 400, description = "Fewer than two values for the metric", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Analysis"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn trend_analysis(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Query<TrendParams>,
) -> Result<Json<TrendAnalysis>, AppError> {
    let records = records_of(&state, &user).await?;
    Ok(Json(state.analysis.analyze_trend(&records, params.metric_type)?))
}

/// Pairwise correlations between metrics
#[utoipa::path(
    get,
    path = "/api/v1/analysis/correlations",
    responses(
        (status = 200, description = "Correlations", body = [Correlation]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Analysis"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn correlations(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<Json<Vec<Correlation>>, AppError> {
    let records = records_of(&state, &user).await?;
    Ok(Json(state.analysis.analyze_correlations(&records)))
}

/// Stability score per metric and the overall score
#[utoipa::path(
    get,
    path = "/api/v1/analysis/dimensions",
    responses(
        (status = 200, description = "Dimension scores", body = DimensionsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Analysis"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn dimensions(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<Json<DimensionsResponse>, AppError> {
    let records = records_of(&state, &user).await?;
    let dimensions = state.analysis.dimension_scores(&records);

    Ok(Json(DimensionsResponse {
        overall_score: state.analysis.overall_score(&dimensions),
        dimensions,
    }))
}

/// Personalized advice, most urgent first
#[utoipa::path(
    get,
    path = "/api/v1/analysis/advice",
    responses(
        (status = 200, description = "Advice", body = [HealthAdvice]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Analysis"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn advice(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<Json<Vec<HealthAdvice>>, AppError> {
    let records = records_of(&state, &user).await?;
    Ok(Json(state.analysis.generate_advice(&records)))
}
