use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Kinds of security-relevant events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEventType {
    Login,
    Logout,
    TokenRefresh,
    TokenRevocation,
    Registration,
    FailedLogin,
    AccessDenied,
    TokenValidation,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuthEventType::Login => "LOGIN",
            AuthEventType::Logout => "LOGOUT",
            AuthEventType::TokenRefresh => "TOKEN_REFRESH",
            AuthEventType::TokenRevocation => "TOKEN_REVOCATION",
            AuthEventType::Registration => "REGISTRATION",
            AuthEventType::FailedLogin => "FAILED_LOGIN",
            AuthEventType::AccessDenied => "ACCESS_DENIED",
            AuthEventType::TokenValidation => "TOKEN_VALIDATION",
        };
        f.write_str(name)
    }
}

/// One audit entry. Never carries passwords or raw tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub event_type: AuthEventType,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub details: Option<String>,
    pub resource: Option<String>,
    pub auth_method: Option<String>,
}

impl AuthEvent {
    pub fn new(event_type: AuthEventType, user_id: Option<&str>, success: bool) -> Self {
        Self {
            event_type,
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            success,
            details: None,
            resource: None,
            auth_method: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }
}

pub fn log_auth_event(event: AuthEvent) {
    let user_id = event.user_id.as_deref().unwrap_or("anonymous");
    let details = event.details.as_deref().unwrap_or("");
    let resource = event.resource.as_deref().unwrap_or("-");

    if event.success {
        info!(
            "AUTH-LOG [{}] [{}] [SUCCESS] [{}] [{}] {}",
            event.event_type,
            user_id,
            event.timestamp.to_rfc3339(),
            resource,
            details
        );
    } else {
        warn!(
            "AUTH-LOG [{}] [{}] [FAILURE] [{}] [{}] {}",
            event.event_type,
            user_id,
            event.timestamp.to_rfc3339(),
            resource,
            details
        );
    }
}

pub fn log_registration(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Registration, Some(user_id), true).with_auth_method("password"));
}

pub fn log_successful_login(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Login, Some(user_id), true).with_auth_method("password"));
}

/// `email` is logged as given; the reason is kept generic in responses but not here
pub fn log_failed_login(email: &str, reason: &str) {
    let event = AuthEvent::new(AuthEventType::FailedLogin, Some(email), false)
        .with_details(reason)
        .with_auth_method("password");
    log_auth_event(event);
}

pub fn log_token_validation(user_id: Option<&str>, success: bool, details: &str) {
    let event = AuthEvent::new(AuthEventType::TokenValidation, user_id, success)
        .with_details(details)
        .with_auth_method("bearer");
    log_auth_event(event);
}

pub fn log_token_refresh(user_id: &str, success: bool, details: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::TokenRefresh, Some(user_id), success);
    if let Some(d) = details {
        event = event.with_details(d);
    }
    log_auth_event(event);
}

pub fn log_logout(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Logout, Some(user_id), true));
}

pub fn log_token_revocation(user_id: &str, reason: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::TokenRevocation, Some(user_id), true);
    if let Some(r) = reason {
        event = event.with_details(r);
    }
    log_auth_event(event);
}

pub fn log_access_denied(user_id: &str, resource: &str, required_roles: &[String]) {
    let event = AuthEvent::new(AuthEventType::AccessDenied, Some(user_id), false)
        .with_resource(resource)
        .with_details(format!("Required roles: {}", required_roles.join(", ")));
    log_auth_event(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_auth_event() {
        let event = AuthEvent::new(AuthEventType::Login, Some("user123"), true)
            .with_details("Login from dashboard")
            .with_resource("/api/v1/auth/login")
            .with_auth_method("password");

        assert_eq!(event.event_type, AuthEventType::Login);
        assert_eq!(event.user_id, Some("user123".to_string()));
        assert!(event.success);
        assert_eq!(event.details, Some("Login from dashboard".to_string()));
        assert_eq!(event.resource, Some("/api/v1/auth/login".to_string()));
        assert_eq!(event.auth_method, Some("password".to_string()));
    }

    #[test]
    fn test_event_type_display() {
        assert_eq!(AuthEventType::Login.to_string(), "LOGIN");
        assert_eq!(AuthEventType::Logout.to_string(), "LOGOUT");
        assert_eq!(AuthEventType::FailedLogin.to_string(), "FAILED_LOGIN");
        assert_eq!(AuthEventType::Registration.to_string(), "REGISTRATION");
    }

    #[test]
    fn test_anonymous_event_serializes() {
        let event = AuthEvent::new(AuthEventType::TokenValidation, None, false);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "TokenValidation");
        assert!(json["user_id"].is_null());
    }
}
