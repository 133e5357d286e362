use axum::{extract::State, Extension, Json};
use tracing::{info, instrument};

use health_manager_domain::auth::UserInfo;
use health_manager_domain::entities::{VitalsAssessmentRequest, VitalsReport};
use health_manager_domain::errors::{AppError, ErrorResponse};

use crate::api::state::AppState;

/// Assess a snapshot of vitals, nutrition, activity, sleep and stress
#[utoipa::path(
    post,
    path = "/api/v1/vitals/assessment",
    request_body = VitalsAssessmentRequest,
    responses(
        (status = 200, description = "Risks, overall health and recommendations", body = VitalsReport),
        (status = 400, description = "Unknown monitor field", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Vitals"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn assess_vitals(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<VitalsAssessmentRequest>,
) -> Result<Json<VitalsReport>, AppError> {
    let triggered = state.vitals.triggered_monitors(&request.snapshot, &request.monitors)?;
    let mut report = state.vitals.assess(&request.snapshot);
    report.triggered_monitors = triggered;

    info!(
        "Vitals assessment: {:?} with {} risk(s)",
        report.overall_health,
        report.risks.len()
    );
    Ok(Json(report))
}
