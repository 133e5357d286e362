// Testing utilities for the domain layer and the crates above it.
// Available in unit tests and with the "mock" feature.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use health_manager_data::repository::mocks::{MockAlertRepository, MockHealthRecordRepository, MockUserRepository};

use crate::health::{overall_status, ComponentStatus, HealthComponent, HealthServiceTrait, SystemHealth};
use crate::services::alerts::{AlertService, AlertServiceTrait};
use crate::services::health_data::{HealthDataService, HealthDataServiceTrait};
use crate::services::metrics::MetricsServiceTrait;
use crate::services::user::{UserService, UserServiceTrait};

/// Health service with a configurable database status
#[derive(Debug)]
pub struct MockHealthService {
    database_status: ComponentStatus,
    components: BTreeMap<String, HealthComponent>,
}

impl Default for MockHealthService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHealthService {
    /// All components healthy
    pub fn new() -> Self {
        Self {
            database_status: ComponentStatus::Healthy,
            components: BTreeMap::new(),
        }
    }

    pub fn with_degraded_database(mut self) -> Self {
        self.database_status = ComponentStatus::Degraded;
        self
    }

    pub fn with_unhealthy_database(mut self) -> Self {
        self.database_status = ComponentStatus::Unhealthy;
        self
    }

    pub fn with_component(mut self, name: &str, status: ComponentStatus, details: Option<String>) -> Self {
        self.components
            .insert(name.to_string(), HealthComponent { status, details });
        self
    }
}

#[async_trait]
impl HealthServiceTrait for MockHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = self.components.clone();
        components.insert(
            "database".to_string(),
            HealthComponent {
                status: self.database_status,
                details: match self.database_status {
                    ComponentStatus::Healthy => None,
                    ComponentStatus::Degraded => Some("Database is experiencing high load".to_string()),
                    ComponentStatus::Unhealthy => Some("Database connection failed".to_string()),
                },
            },
        );

        SystemHealth {
            status: overall_status(components.values()),
            version: "test".to_string(),
            uptime_seconds: 0,
            components,
        }
    }

    async fn check_database_status(&self) -> Result<bool, String> {
        match self.database_status {
            ComponentStatus::Healthy => Ok(true),
            ComponentStatus::Degraded => Ok(false),
            ComponentStatus::Unhealthy => Err("Database connection failed".to_string()),
        }
    }
}

/// User service over an in-memory mock repository
pub fn mock_user_service(metrics: Arc<dyn MetricsServiceTrait>, admin_emails: Vec<String>) -> impl UserServiceTrait {
    UserService::new(MockUserRepository::new(), metrics, admin_emails)
}

/// Alert service over an in-memory mock repository
pub fn mock_alert_service(metrics: Arc<dyn MetricsServiceTrait>) -> impl AlertServiceTrait {
    AlertService::new(MockAlertRepository::new(), metrics)
}

/// Health data service over an in-memory mock repository
pub fn mock_health_data_service(
    alerts: Arc<dyn AlertServiceTrait>,
    metrics: Arc<dyn MetricsServiceTrait>,
) -> impl HealthDataServiceTrait {
    HealthDataService::new(MockHealthRecordRepository::new(), alerts, metrics)
}

pub fn create_mock_health_service() -> impl HealthServiceTrait {
    MockHealthService::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::SystemStatus;

    #[test]
    fn test_unhealthy_database_degrades_system() {
        let service = MockHealthService::new().with_unhealthy_database();
        let health = tokio_test::block_on(service.get_system_health());

        assert_eq!(health.status, SystemStatus::Degraded);
        assert_eq!(health.components["database"].status, ComponentStatus::Unhealthy);
        assert!(tokio_test::block_on(service.check_database_status()).is_err());
    }

    #[tokio::test]
    async fn test_healthy_by_default() {
        let service = create_mock_health_service();
        let health = service.get_system_health().await;
        assert_eq!(health.status, SystemStatus::Healthy);
        assert_eq!(service.check_database_status().await, Ok(true));
    }
}
