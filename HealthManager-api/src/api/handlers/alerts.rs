use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use health_manager_domain::auth::UserInfo;
use health_manager_domain::entities::{Alert, AlertQuery};
use health_manager_domain::errors::{AppError, ErrorResponse};

use crate::api::state::AppState;

/// Result of a bulk delete
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClearedResponse {
    pub removed: usize,
}

/// The caller's alerts, newest first
#[utoipa::path(
    get,
    path = "/api/v1/alerts",
    params(AlertQuery),
    responses(
        (status = 200, description = "Alerts", body = [Alert]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Alerts"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_alerts(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<Vec<Alert>>, AppError> {
    let alerts = state
        .alerts
        .list(&user.user_id, query.metric_type, query.active_only)
        .await?;
    Ok(Json(alerts))
}

/// Mark one alert as handled
#[utoipa::path(
    post,
    path = "/api/v1/alerts/{id}/handle",
    params(("id" = String, Path, description = "Alert ID")),
    responses(
        (status = 204, description = "Alert handled"),
        (status = 404, description = "No such alert for this user", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Alerts"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn handle_alert(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.alerts.mark_handled(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete the caller's handled alerts
#[utoipa::path(
    delete,
    path = "/api/v1/alerts/handled",
    responses(
        (status = 200, description = "Handled alerts removed", body = ClearedResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Alerts"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn clear_handled_alerts(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<Json<ClearedResponse>, AppError> {
    let removed = state.alerts.clear_handled(&user.user_id).await?;
    info!("Cleared {} handled alert(s)", removed);
    Ok(Json(ClearedResponse { removed }))
}

/// Delete all of the caller's alerts
#[utoipa::path(
    delete,
    path = "/api/v1/alerts",
    responses(
        (status = 200, description = "All alerts removed", body = ClearedResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Alerts"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn clear_all_alerts(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<Json<ClearedResponse>, AppError> {
    let removed = state.alerts.clear_all(&user.user_id).await?;
    info!("Cleared {} alert(s)", removed);
    Ok(Json(ClearedResponse { removed }))
}
