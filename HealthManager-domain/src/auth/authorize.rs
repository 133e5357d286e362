use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::auth::logging::{log_access_denied, log_auth_event, AuthEvent, AuthEventType};
use crate::auth::UserInfo;
use crate::errors::{AppError, AuthError};

/// Role-based access control.
///
/// Must run after `auth_middleware`. Users holding none of `required_roles`
/// get 403; a request without a [`UserInfo`] extension gets 401.
pub async fn require_roles(req: Request<Body>, next: Next, required_roles: Vec<String>) -> Response {
    let request_path = req.uri().path().to_string();

    let Some(user) = req.extensions().get::<UserInfo>().cloned() else {
        warn!("No user info found in request extensions for path: {}", request_path);
        let event = AuthEvent::new(AuthEventType::AccessDenied, None, false)
            .with_details("Authentication context missing")
            .with_resource(request_path)
            .with_auth_method("rbac");
        log_auth_event(event);
        return AppError::Auth(AuthError::MissingToken).into_response();
    };

    if required_roles.iter().any(|role| user.has_role(role)) {
        debug!("User {} authorized for {}", user.user_id, request_path);
        return next.run(req).await;
    }

    warn!(
        "User {} lacks required roles {:?} for {}",
        user.user_id, required_roles, request_path
    );
    log_access_denied(&user.user_id, &request_path, &required_roles);
    AppError::Forbidden("You don't have the required permissions to access this resource".to_string())
        .into_response()
}

/// Middleware requiring a single role.
///
/// ```ignore
/// let admin_routes = Router::new()
///     .route("/admin/metrics", get(metrics))
///     .layer(middleware::from_fn(require_role(ROLE_ADMIN)));
/// ```
pub fn require_role(
    role: &str,
) -> impl Fn(Request<Body>, Next) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
    require_any_role(&[role])
}

/// Middleware requiring any of several roles
pub fn require_any_role(
    roles: &[&str],
) -> impl Fn(Request<Body>, Next) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    move |req, next| {
        let roles = roles.clone();
        Box::pin(async move { require_roles(req, next, roles).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn user_info(roles: &[&str]) -> UserInfo {
        UserInfo {
            user_id: "test-user".to_string(),
            email: "test@example.com".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn app() -> Router {
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn(require_role("admin")))
    }

    fn request(user: Option<UserInfo>) -> Request<Body> {
        let mut req = Request::builder().uri("/admin").body(Body::empty()).unwrap();
        if let Some(user) = user {
            req.extensions_mut().insert(user);
        }
        req
    }

    #[tokio::test]
    async fn test_require_roles_with_matching_role() {
        let response = app().oneshot(request(Some(user_info(&["user", "admin"])))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_require_roles_with_no_matching_role() {
        let response = app().oneshot(request(Some(user_info(&["user"])))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_require_roles_without_user_info() {
        let response = app().oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_any_role() {
        let app = Router::new()
            .route("/reports", get(|| async { "ok" }))
            .layer(middleware::from_fn(require_any_role(&["admin", "analyst"])));

        let mut req = Request::builder().uri("/reports").body(Body::empty()).unwrap();
        req.extensions_mut().insert(user_info(&["analyst"]));
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::OK);
    }
}
