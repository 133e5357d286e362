use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use health_manager_domain::auth::{self, auth_middleware, configure_auth, require_role};
use health_manager_domain::entities::ROLE_ADMIN;

use crate::api::handlers::{admin, alerts, analysis, health, health_records, trends, users, vitals};
use crate::api::state::AppState;
use crate::openapi::configure_swagger_routes;

/// Create the application router
pub fn create_app(state: AppState) -> Router {
    debug!("Creating application router");

    // Routes anyone can reach
    let public_routes = Router::new()
        .route("/auth/register", post(crate::api::handlers::auth::register))
        .route("/auth/login", post(crate::api::handlers::auth::login))
        .route("/auth/refresh", post(auth::refresh_token));

    debug!("Public routes configured");

    // Routes that need a valid access token.
    // Literal segments are declared before parameterized ones.
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/users/me", get(users::get_me).put(users::update_me))
        .route(
            "/health-records",
            get(health_records::list_health_records).post(health_records::create_health_record),
        )
        .route(
            "/health-records/:id",
            get(health_records::get_health_record).delete(health_records::delete_health_record),
        )
        .route("/analysis/risk", get(analysis::risk_assessment))
        .route("/analysis/trend", get(analysis::trend_analysis))
        .route("/analysis/correlations", get(analysis::correlations))
        .route("/analysis/dimensions", get(analysis::dimensions))
        .route("/analysis/advice", get(analysis::advice))
        .route("/vitals/assessment", post(vitals::assess_vitals))
        .route("/trends", get(trends::health_trends))
        .route("/alerts", get(alerts::list_alerts).delete(alerts::clear_all_alerts))
        .route("/alerts/handled", delete(alerts::clear_handled_alerts))
        .route("/alerts/:id/handle", post(alerts::handle_alert))
        .layer(middleware::from_fn(auth_middleware));

    debug!("Protected routes configured");

    // Authentication must run before authorization, so it is the outer layer
    let admin_routes = Router::new()
        .route(
            "/admin/alert-rules",
            get(admin::list_alert_rules).post(admin::create_alert_rule),
        )
        .route("/admin/alert-rules/reset", post(admin::reset_alert_rules))
        .route(
            "/admin/alert-rules/:id",
            put(admin::update_alert_rule).delete(admin::delete_alert_rule),
        )
        .route("/admin/metrics", get(admin::metrics))
        .layer(middleware::from_fn(require_role(ROLE_ADMIN)))
        .layer(middleware::from_fn(auth_middleware));

    debug!("Admin routes configured");

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes);

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes)
        .with_state(state);

    debug!("API routes nested");

    let app = add_swagger_ui(app);
    debug!("Swagger UI merged");

    let app = configure_auth(app);
    debug!("Security configuration applied");

    app.layer(TraceLayer::new_for_http())
}

/// Add Swagger UI to the router
pub fn add_swagger_ui(app: Router) -> Router {
    app.merge(configure_swagger_routes())
}
