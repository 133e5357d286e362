//! System health checks
//!
//! The database is the only external component. Repositories fall back to
//! in-memory storage when it is down, so an unavailable database degrades the
//! system instead of taking it down.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use health_manager_data::database;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Overall system status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Status of a single component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HealthComponent {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct SystemHealth {
    pub status: SystemStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: BTreeMap<String, HealthComponent>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    async fn get_system_health(&self) -> SystemHealth;

    /// `Ok(true)` when the database answers, `Err` when it cannot be reached
    async fn check_database_status(&self) -> Result<bool, String>;
}

/// Overall status from the component statuses
pub fn overall_status<'a>(components: impl IntoIterator<Item = &'a HealthComponent>) -> SystemStatus {
    let mut status = SystemStatus::Healthy;
    for component in components {
        match component.status {
            ComponentStatus::Healthy => {}
            ComponentStatus::Degraded | ComponentStatus::Unhealthy => status = SystemStatus::Degraded,
        }
    }
    status
}

/// Health service backed by the global database pool
#[derive(Debug)]
pub struct DefaultHealthService {
    version: String,
    started_at: Instant,
}

impl DefaultHealthService {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            started_at: Instant::now(),
        }
    }
}

#[async_trait]
impl HealthServiceTrait for DefaultHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let database = match self.check_database_status().await {
            Ok(true) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: database::get_connection_info(),
            },
            Ok(false) => HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("Database answered but is not fully operational".to_string()),
            },
            Err(e) => HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(format!("{}; using in-memory storage", e)),
            },
        };

        let components: BTreeMap<String, HealthComponent> = [("database".to_string(), database)].into_iter().collect();

        SystemHealth {
            status: overall_status(components.values()),
            version: self.version.clone(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            components,
        }
    }

    async fn check_database_status(&self) -> Result<bool, String> {
        let pool = database::get_db_pool().map_err(|e| format!("Database connection error: {}", e))?;

        // r2d2 checkouts block
        let result = tokio::task::spawn_blocking(move || database::ping(&pool))
            .await
            .map_err(|e| format!("Database check failed: {}", e))?;

        match result {
            Ok(()) => {
                debug!("Database ping succeeded");
                Ok(true)
            }
            Err(e) => {
                warn!("Database ping failed: {}", e);
                Err(format!("Database ping failed: {}", e))
            }
        }
    }
}

/// Create the default health service reporting `version`
pub fn create_default_health_service(version: impl Into<String>) -> impl HealthServiceTrait {
    DefaultHealthService::new(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_system_health() {
        let service = DefaultHealthService::new("1.2.3");
        let health = service.get_system_health().await;

        // database availability depends on the environment
        assert!(health.components.contains_key("database"));
        assert_eq!(health.version, "1.2.3");
        assert_ne!(health.status, SystemStatus::Unhealthy);
    }

    #[test]
    fn test_overall_status() {
        let healthy = HealthComponent {
            status: ComponentStatus::Healthy,
            details: None,
        };
        let down = HealthComponent {
            status: ComponentStatus::Unhealthy,
            details: Some("down".to_string()),
        };

        assert_eq!(overall_status([&healthy]), SystemStatus::Healthy);
        assert_eq!(overall_status([&healthy, &down]), SystemStatus::Degraded);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(SystemStatus::Degraded).unwrap(), "degraded");
        assert_eq!(serde_json::to_value(ComponentStatus::Healthy).unwrap(), "healthy");
    }
}
