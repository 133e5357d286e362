use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};

use health_manager_domain::auth::UserInfo;
use health_manager_domain::entities::{AlertRule, AlertRuleRequest};
use health_manager_domain::errors::{AppError, ErrorResponse};

use crate::api::state::AppState;

/// Every alert rule
#[utoipa::path(
    get,
    path = "/api/v1/admin/alert-rules",
    responses(
        (status = 200, description = "Alert rules", body = [AlertRule]),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn list_alert_rules(State(state): State<AppState>) -> Json<Vec<AlertRule>> {
    Json(state.alerts.rules())
}

/// Add an alert rule
#[utoipa::path(
    post,
    path = "/api/v1/admin/alert-rules",
    request_body = AlertRuleRequest,
    responses(
        (status = 201, description = "Rule added", body = AlertRule),
        (status = 400, description = "Invalid rule", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "A rule with this id exists", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin, request), fields(admin = %admin.user_id))]
pub async fn create_alert_rule(
    State(state): State<AppState>,
    Extension(admin): Extension<UserInfo>,
    Json(request): Json<AlertRuleRequest>,
) -> Result<(StatusCode, Json<AlertRule>), AppError> {
    let rule = state.alerts.add_rule(request)?;
    info!("Admin {} added alert rule {}", admin.user_id, rule.id);
    Ok((StatusCode::CREATED, Json(rule)))
}

/// Replace an alert rule
#[utoipa::path(
    put,
    path = "/api/v1/admin/alert-rules/{id}",
    params(("id" = String, Path, description = "Rule ID")),
    request_body = AlertRuleRequest,
    responses(
        (status = 200, description = "Rule updated", body = AlertRule),
        (status = 400, description = "Invalid rule", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "No such rule", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin, request), fields(admin = %admin.user_id))]
pub async fn update_alert_rule(
    State(state): State<AppState>,
    Extension(admin): Extension<UserInfo>,
    Path(id): Path<String>,
    Json(request): Json<AlertRuleRequest>,
) -> Result<Json<AlertRule>, AppError> {
    let rule = state.alerts.update_rule(&id, request)?;
    info!("Admin {} updated alert rule {}", admin.user_id, id);
    Ok(Json(rule))
}

/// Remove an alert rule
#[utoipa::path(
    delete,
    path = "/api/v1/admin/alert-rules/{id}",
    params(("id" = String, Path, description = "Rule ID")),
    responses(
        (status = 204, description = "Rule removed"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "No such rule", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin), fields(admin = %admin.user_id))]
pub async fn delete_alert_rule(
    State(state): State<AppState>,
    Extension(admin): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.alerts.remove_rule(&id)?;
    info!("Admin {} removed alert rule {}", admin.user_id, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Restore the default rules and clear every cooldown
#[utoipa::path(
    post,
    path = "/api/v1/admin/alert-rules/reset",
    responses(
        (status = 200, description = "Default rules", body = [AlertRule]),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state, admin), fields(admin = %admin.user_id))]
pub async fn reset_alert_rules(
    State(state): State<AppState>,
    Extension(admin): Extension<UserInfo>,
) -> Json<Vec<AlertRule>> {
    state.alerts.reset();
    info!("Admin {} reset the alert rules", admin.user_id);
    Json(state.alerts.rules())
}

/// Current value of every counter
#[utoipa::path(
    get,
    path = "/api/v1/admin/metrics",
    responses(
        (status = 200, description = "Counters by name", body = Object),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn metrics(State(state): State<AppState>) -> Json<BTreeMap<String, u64>> {
    Json(state.metrics.snapshot())
}
