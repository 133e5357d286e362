use std::sync::Arc;

use health_manager_domain::health::{create_default_health_service, HealthServiceTrait};
use health_manager_domain::services::{
    create_default_alert_service, create_default_analysis_service, create_default_health_data_service,
    create_default_metrics_service, create_default_trend_service, create_default_user_service,
    create_default_vitals_service, AlertServiceTrait, AnalysisServiceTrait, HealthDataServiceTrait,
    MetricsServiceTrait, TrendServiceTrait, UserServiceTrait, VitalsServiceTrait,
};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub health_data: Arc<dyn HealthDataServiceTrait>,
    pub alerts: Arc<dyn AlertServiceTrait>,
    pub metrics: Arc<dyn MetricsServiceTrait>,
    pub users: Arc<dyn UserServiceTrait>,
    pub analysis: Arc<dyn AnalysisServiceTrait>,
    pub vitals: Arc<dyn VitalsServiceTrait>,
    pub trends: Arc<dyn TrendServiceTrait>,
    pub health: Arc<dyn HealthServiceTrait>,
}

impl AppState {
    /// Production wiring: repositories backed by the global database pool
    pub fn new() -> Self {
        let metrics: Arc<dyn MetricsServiceTrait> = Arc::new(create_default_metrics_service());
        let alerts: Arc<dyn AlertServiceTrait> = Arc::new(create_default_alert_service(metrics.clone()));

        Self {
            health_data: Arc::new(create_default_health_data_service(alerts.clone(), metrics.clone())),
            users: Arc::new(create_default_user_service(metrics.clone())),
            analysis: Arc::new(create_default_analysis_service()),
            vitals: Arc::new(create_default_vitals_service()),
            trends: Arc::new(create_default_trend_service()),
            health: Arc::new(create_default_health_service(env!("CARGO_PKG_VERSION"))),
            alerts,
            metrics,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
