use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the bearer scheme the protected paths refer to
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoint
        crate::api::handlers::health::health_check,

        // Auth endpoints
        crate::api::handlers::auth::register,
        crate::api::handlers::auth::login,
        health_manager_domain::auth::refresh_token,
        health_manager_domain::auth::logout,

        // Users
        crate::api::handlers::users::get_me,
        crate::api::handlers::users::update_me,

        // Health records
        crate::api::handlers::health_records::create_health_record,
        crate::api::handlers::health_records::list_health_records,
        crate::api::handlers::health_records::get_health_record,
        crate::api::handlers::health_records::delete_health_record,

        // Analysis
        crate::api::handlers::analysis::risk_assessment,
        crate::api::handlers::analysis::trend_analysis,
        crate::api::handlers::analysis::correlations,
        crate::api::handlers::analysis::dimensions,
        crate::api::handlers::analysis::advice,

        // Vitals and trends
        crate::api::handlers::vitals::assess_vitals,
        crate::api::handlers::trends::health_trends,

        // Alerts
        crate::api::handlers::alerts::list_alerts,
        crate::api::handlers::alerts::handle_alert,
        crate::api::handlers::alerts::clear_handled_alerts,
        crate::api::handlers::alerts::clear_all_alerts,

        // Admin
        crate::api::handlers::admin::list_alert_rules,
        crate::api::handlers::admin::create_alert_rule,
        crate::api::handlers::admin::update_alert_rule,
        crate::api::handlers::admin::delete_alert_rule,
        crate::api::handlers::admin::reset_alert_rules,
        crate::api::handlers::admin::metrics
    ),
    components(
        schemas(
            // Envelopes
            crate::entities::common::Pagination,
            crate::entities::common::HealthRecordPage,
            health_manager_domain::errors::ErrorResponse,

            // Health
            health_manager_domain::health::SystemHealth,
            health_manager_domain::health::SystemStatus,
            health_manager_domain::health::ComponentStatus,
            health_manager_domain::health::HealthComponent,

            // Auth and users
            health_manager_domain::auth::LoginRequest,
            health_manager_domain::auth::LoginResponse,
            health_manager_domain::auth::RefreshResponse,
            health_manager_domain::auth::LogoutRequest,
            health_manager_domain::auth::UserInfo,
            health_manager_domain::entities::User,
            health_manager_domain::entities::RegisterRequest,
            health_manager_domain::entities::UpdateProfileRequest,

            // Health records
            health_manager_domain::entities::HealthMetricType,
            health_manager_domain::entities::HealthRecord,
            health_manager_domain::entities::CreateHealthRecordRequest,
            health_manager_domain::services::RecordOutcome,

            // Analysis
            health_manager_domain::entities::RiskLevel,
            health_manager_domain::entities::RiskDetail,
            health_manager_domain::entities::RiskAssessment,
            health_manager_domain::entities::TrendType,
            health_manager_domain::entities::PredictionModel,
            health_manager_domain::entities::Seasonality,
            health_manager_domain::entities::SeasonalityPattern,
            health_manager_domain::entities::Outlier,
            health_manager_domain::entities::TrendAnalysis,
            health_manager_domain::entities::Correlation,
            health_manager_domain::entities::DimensionStatus,
            health_manager_domain::entities::DimensionAnalysis,
            health_manager_domain::entities::AdviceCategory,
            health_manager_domain::entities::Impact,
            health_manager_domain::entities::HealthAdvice,
            crate::api::handlers::analysis::TrendParams,
            crate::api::handlers::analysis::DimensionsResponse,

            // Vitals and trends
            health_manager_domain::entities::BloodPressureValue,
            health_manager_domain::entities::VitalsSnapshot,
            health_manager_domain::entities::VitalsMonitor,
            health_manager_domain::entities::VitalsAssessmentRequest,
            health_manager_domain::entities::VitalsRisk,
            health_manager_domain::entities::OverallHealth,
            health_manager_domain::entities::VitalsReport,
            health_manager_domain::entities::HealthTrendPoint,

            // Alerts
            health_manager_domain::entities::AlertLevel,
            health_manager_domain::entities::ConditionOp,
            health_manager_domain::entities::AlertCondition,
            health_manager_domain::entities::AlertRule,
            health_manager_domain::entities::AlertRuleRequest,
            health_manager_domain::entities::Alert,
            crate::api::handlers::alerts::ClearedResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "Authentication", description = "Registration, login and token management"),
        (name = "Users", description = "The caller's profile"),
        (name = "Health records", description = "Recording and browsing health metrics"),
        (name = "Analysis", description = "Risk, trend, correlation and advice analysis"),
        (name = "Vitals", description = "One-off assessment of a vitals snapshot"),
        (name = "Trends", description = "Daily BMI, health and exercise scores"),
        (name = "Alerts", description = "Alerts raised by recorded values"),
        (name = "Admin", description = "Alert rules and service counters")
    ),
    info(
        title = "HealthManager API",
        version = "0.1.0",
        description = "API for recording health metrics, analyzing them and raising alerts",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "HealthManager API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().unwrap();
        for name in ["health", "Authentication", "Health records", "Alerts", "Admin"] {
            assert!(tags.iter().any(|tag| tag.name == name), "missing tag {}", name);
        }

        let paths = &openapi.paths.paths;
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/api/v1/auth/login"));
        assert!(paths.contains_key("/api/v1/auth/refresh"));
        assert!(paths.contains_key("/api/v1/health-records"));
        assert!(paths.contains_key("/api/v1/health-records/{id}"));
        assert!(paths.contains_key("/api/v1/analysis/trend"));
        assert!(paths.contains_key("/api/v1/alerts/{id}/handle"));
        assert!(paths.contains_key("/api/v1/admin/alert-rules/{id}"));
    }

    #[test]
    fn test_security_scheme_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();

        assert!(components.security_schemes.contains_key("jwt_auth"));
        assert!(components.schemas.contains_key("HealthRecordPage"));
        assert!(components.schemas.contains_key("ErrorResponse"));
    }
}
