use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument};

use health_manager_domain::auth::logging::{log_failed_login, log_registration, log_successful_login};
use health_manager_domain::auth::{issue_tokens, LoginRequest, LoginResponse};
use health_manager_domain::entities::RegisterRequest;
use health_manager_domain::errors::{AppError, ErrorResponse};

use crate::api::state::AppState;

/// Create an account and sign it in
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = LoginResponse),
        (status = 400, description = "Invalid email, password or name", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let user = state.users.register(request).await?;
    log_registration(&user.id);
    info!("Registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(issue_tokens(&user)?)))
}

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful. Send the access_token as 'Bearer {token}'.", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = match state.users.authenticate(&request.email, &request.password).await {
        Ok(user) => user,
        Err(e) => {
            log_failed_login(&request.email, &e.to_string());
            return Err(e);
        }
    };

    log_successful_login(&user.id);
    Ok(Json(issue_tokens(&user)?))
}
