use axum::{extract::State, Extension, Json};
use tracing::instrument;

use health_manager_domain::auth::UserInfo;
use health_manager_domain::entities::{UpdateProfileRequest, User};
use health_manager_domain::errors::{AppError, ErrorResponse};

use crate::api::state::AppState;

/// The caller's profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_me(State(state): State<AppState>, Extension(user): Extension<UserInfo>) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.find_by_id(&user.user_id).await?))
}

/// Update the caller's profile
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Invalid profile fields", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.update_profile(&user.user_id, request).await?))
}
