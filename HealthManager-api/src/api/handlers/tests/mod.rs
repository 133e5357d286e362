
use std::sync::Arc;

use health_manager_domain::health::HealthServiceTrait;
use health_manager_domain::services::{
    create_default_analysis_service, create_default_metrics_service, create_default_trend_service,
    create_default_vitals_service, AlertServiceTrait, MetricsServiceTrait,
};
use health_manager_domain::testing::{mock_alert_service, mock_health_data_service, mock_user_service};

use crate::api::state::AppState;

/// State over in-memory repositories with the given health service
pub(crate) fn test_state(health: Arc<dyn HealthServiceTrait>) -> AppState {
    let metrics: Arc<dyn MetricsServiceTrait> = Arc::new(create_default_metrics_service());
    let alerts: Arc<dyn AlertServiceTrait> = Arc::new(mock_alert_service(metrics.clone()));

    AppState {
        health_data: Arc::new(mock_health_data_service(alerts.clone(), metrics.clone())),
        users: Arc::new(mock_user_service(metrics.clone(), Vec::new())),
        analysis: Arc::new(create_default_analysis_service()),
        vitals: Arc::new(create_default_vitals_service()),
        trends: Arc::new(create_default_trend_service()),
        health,
        alerts,
        metrics,
    }
}
