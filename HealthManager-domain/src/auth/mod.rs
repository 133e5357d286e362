//! Authentication for the HealthManager API
//!
//! Issues and validates JWT access/refresh tokens, guards protected routes and
//! applies CORS and security headers.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, warn};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::auth::logging::{log_logout, log_token_refresh, log_token_validation};
use crate::entities::User;
use crate::errors::{AppError, AuthError};

pub mod authorize;
pub mod logging;
pub mod password;
pub mod token;
pub mod token_blacklist;

pub use authorize::{require_any_role, require_role};
pub use token::{SecurityError, TokenType};

/// JWT claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub iss: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Unique token id, the unit of revocation
    pub jti: String,
    /// "access" or "refresh"
    pub typ: String,
    pub email: String,
    pub roles: Vec<String>,
}

/// Caller identity placed in request extensions by [`auth_middleware`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl UserInfo {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<&Claims> for UserInfo {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            email: claims.email.clone(),
            roles: claims.roles.clone(),
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Tokens handed out on login and registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LoginResponse {
    /// JWT access token
    pub access_token: String,
    /// JWT refresh token, exchanged at `/api/v1/auth/refresh`
    pub refresh_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: User,
}

/// New access token issued from a refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Optional logout body; the refresh token is revoked too when given
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Issue an access/refresh token pair for a user
pub fn issue_tokens(user: &User) -> Result<LoginResponse, AppError> {
    let access_token = token::generate_token(&user.id, &user.email, &user.roles, TokenType::Access)?;
    let refresh_token = token::generate_token(&user.id, &user.email, &user.roles, TokenType::Refresh)?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.expiration().num_seconds(),
        user: user.clone(),
    })
}

/// Extract the token from an `Authorization: Bearer ...` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(header::AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = value.to_str().map_err(|_| AuthError::InvalidToken)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidToken),
    }
}

/// Authentication middleware for protected routes.
///
/// Accepts access tokens only. On success the request carries [`UserInfo`] and
/// [`Claims`] extensions.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Response {
    let request_path = req.uri().path().to_string();

    let token = match bearer_token(req.headers()) {
        Ok(token) => token,
        Err(e) => {
            debug!("Rejected request to {}: {}", request_path, e);
            log_token_validation(None, false, &format!("{} ({})", e, request_path));
            return AppError::Auth(e).into_response();
        }
    };

    match token::validate_token(token, TokenType::Access) {
        Ok(claims) => {
            debug!("Token validated for user {} on {}", claims.sub, request_path);
            req.extensions_mut().insert(UserInfo::from(&claims));
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            warn!("Token rejected on {}: {}", request_path, e);
            log_token_validation(None, false, &format!("{} ({})", e, request_path));
            AppError::from(e).into_response()
        }
    }
}

fn allowed_origins() -> tower_http::cors::AllowOrigin {
    use axum::http::HeaderValue;
    use tower_http::cors::{AllowOrigin, Any};

    let origins: Vec<HeaderValue> = env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    }
}

/// Apply CORS and security headers to the application
pub fn configure_auth(app: axum::Router) -> axum::Router {
    use axum::http::{HeaderName, HeaderValue, Method};
    use tower_http::cors::CorsLayer;
    use tower_http::set_header::SetResponseHeaderLayer;

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
        ));

    app.layer(cors).layer(security_headers)
}

/// Exchange a refresh token for a new access token
#[cfg_attr(feature = "with-api", utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "Token refreshed", body = RefreshResponse),
        (status = 401, description = "Missing, invalid, expired or revoked refresh token", body = crate::errors::ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Authentication"
))]
pub async fn refresh_token(headers: HeaderMap) -> Result<Json<RefreshResponse>, AppError> {
    let token = bearer_token(&headers)?;

    let claims = token::validate_token(token, TokenType::Refresh).map_err(|e| {
        warn!("Refresh rejected: {}", e);
        log_token_refresh("unknown", false, Some(&e.to_string()));
        AppError::from(e)
    })?;

    let access_token = token::generate_token(&claims.sub, &claims.email, &claims.roles, TokenType::Access)?;
    log_token_refresh(&claims.sub, true, None);

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.expiration().num_seconds(),
    }))
}

/// Revoke the presented access token and, when given, the matching refresh token
#[cfg_attr(feature = "with-api", utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    request_body(content = LogoutRequest, description = "Optional refresh token to revoke as well"),
    responses(
        (status = 200, description = "Logged out", body = serde_json::Value),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "Authentication"
))]
pub async fn logout(
    Extension(claims): Extension<Claims>,
    body: Option<Json<LogoutRequest>>,
) -> Result<Json<serde_json::Value>, AppError> {
    token::revoke_token(&claims)?;

    if let Some(refresh) = body.and_then(|Json(req)| req.refresh_token) {
        match token::validate_token(&refresh, TokenType::Refresh) {
            Ok(refresh_claims) if refresh_claims.sub == claims.sub => token::revoke_token(&refresh_claims)?,
            Ok(_) => return Err(AppError::Forbidden("Refresh token belongs to another user".to_string())),
            Err(e) => debug!("Ignoring unusable refresh token on logout: {}", e),
        }
    }

    log_logout(&claims.sub);
    Ok(Json(serde_json::json!({
        "message": "Logged out successfully",
        "status": "success"
    })))
}
