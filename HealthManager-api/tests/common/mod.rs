use std::sync::{Arc, Once};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use health_manager_api::api::{create_application, AppState};
use health_manager_domain::services::{
    create_default_analysis_service, create_default_metrics_service, create_default_trend_service,
    create_default_vitals_service, AlertServiceTrait, MetricsServiceTrait,
};
use health_manager_domain::testing::{
    create_mock_health_service, mock_alert_service, mock_health_data_service, mock_user_service,
};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "correct horse battery";

static INIT: Once = Once::new();

fn initialize() {
    INIT.call_once(|| {
        std::env::set_var("JWT_SECRET", "test_secret_key_for_testing_only");
        std::env::set_var("JWT_ISSUER", "test-issuer");
    });
}

/// Application over in-memory repositories; `ADMIN_EMAIL` registers as admin
pub fn test_app() -> Router {
    initialize();

    let metrics: Arc<dyn MetricsServiceTrait> = Arc::new(create_default_metrics_service());
    let alerts: Arc<dyn AlertServiceTrait> = Arc::new(mock_alert_service(metrics.clone()));

    let state = AppState {
        health_data: Arc::new(mock_health_data_service(alerts.clone(), metrics.clone())),
        users: Arc::new(mock_user_service(metrics.clone(), vec![ADMIN_EMAIL.to_string()])),
        analysis: Arc::new(create_default_analysis_service()),
        vitals: Arc::new(create_default_vitals_service()),
        trends: Arc::new(create_default_trend_service()),
        health: Arc::new(create_mock_health_service()),
        alerts,
        metrics,
    };

    create_application(state)
}

/// Send one request and decode the JSON body (`Null` when empty)
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Register an account and return its access and refresh tokens
pub async fn register(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(serde_json::json!({ "email": email, "password": PASSWORD, "name": "Test User" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);

    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}
