use async_trait::async_trait;
use tracing::{debug, error};

use crate::database::{get_db_pool, DatabaseError, DatabasePool};
use crate::models::{AlertFilter, AlertRecord};
use super::errors::RepositoryError;
use super::in_memory::InMemoryStorage;
use super::storage::DatabaseStorage;

/// Repository trait for triggered alerts
#[async_trait]
pub trait AlertRepositoryTrait: Send + Sync {
    async fn create(&self, alert: AlertRecord) -> Result<AlertRecord, RepositoryError>;

    /// Alerts matching the filter, newest first
    async fn list(&self, filter: AlertFilter) -> Result<Vec<AlertRecord>, RepositoryError>;

    /// Returns false when the alert does not exist or belongs to someone else
    async fn mark_handled(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError>;

    /// Remove a user's alerts, optionally only the handled ones
    async fn delete_for_user(&self, user_id: &str, handled_only: bool) -> Result<usize, RepositoryError>;
}

/// Repository for alerts, database first with in-memory fallback
#[derive(Debug, Clone, Default)]
pub struct AlertRepository {
    storage: InMemoryStorage,
    pool: Option<DatabasePool>,
}

impl AlertRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(pool: DatabasePool) -> Self {
        Self {
            storage: InMemoryStorage::new(),
            pool: Some(pool),
        }
    }

    fn db_pool(&self) -> Result<DatabasePool, DatabaseError> {
        match &self.pool {
            Some(pool) => Ok(pool.clone()),
            None => get_db_pool(),
        }
    }
}

#[async_trait]
impl AlertRepositoryTrait for AlertRepository {
    async fn create(&self, alert: AlertRecord) -> Result<AlertRecord, RepositoryError> {
        match self.db_pool() {
            Ok(pool) => match DatabaseStorage::store_alert(&pool, &alert).await {
                Ok(_) => Ok(alert),
                Err(e) => {
                    error!("Failed to store alert in database: {}", e);
                    self.storage.store_alert(&alert).await
                }
            },
            Err(e) => {
                debug!("Database not available ({}), using in-memory storage for alerts", e);
                self.storage.store_alert(&alert).await
            }
        }
    }

    async fn list(&self, filter: AlertFilter) -> Result<Vec<AlertRecord>, RepositoryError> {
        // Alerts stored during an outage are merged with the persisted ones
        let mut alerts = self.storage.get_alerts(&filter).await?;
        if let Ok(pool) = self.db_pool() {
            match DatabaseStorage::get_alerts(&pool, &filter).await {
                Ok(persisted) => alerts.extend(persisted),
                Err(e) => error!("Failed to list alerts from database: {}", e),
            }
        }
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(alerts)
    }

    async fn mark_handled(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
        if self.storage.mark_alert_handled(user_id, id).await? {
            return Ok(true);
        }
        match self.db_pool() {
            Ok(pool) => DatabaseStorage::mark_alert_handled(&pool, user_id, id).await,
            Err(_) => Ok(false),
        }
    }

    async fn delete_for_user(&self, user_id: &str, handled_only: bool) -> Result<usize, RepositoryError> {
        let mut removed = self.storage.delete_alerts(user_id, handled_only).await?;
        if let Ok(pool) = self.db_pool() {
            removed += DatabaseStorage::delete_alerts(&pool, user_id, handled_only).await?;
        }
        Ok(removed)
    }
}

/// Mock alert repository for testing
#[cfg(any(test, feature = "mock"))]
pub mod tests {
    use super::*;

    /// Mock alert repository backed by plain in-memory storage
    #[derive(Default)]
    pub struct MockAlertRepository {
        storage: InMemoryStorage,
    }

    impl MockAlertRepository {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl AlertRepositoryTrait for MockAlertRepository {
        async fn create(&self, alert: AlertRecord) -> Result<AlertRecord, RepositoryError> {
            self.storage.store_alert(&alert).await
        }

        async fn list(&self, filter: AlertFilter) -> Result<Vec<AlertRecord>, RepositoryError> {
            self.storage.get_alerts(&filter).await
        }

        async fn mark_handled(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
            self.storage.mark_alert_handled(user_id, id).await
        }

        async fn delete_for_user(&self, user_id: &str, handled_only: bool) -> Result<usize, RepositoryError> {
            self.storage.delete_alerts(user_id, handled_only).await
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::database::{create_pool, DatabaseConfig, DatabaseType};

    fn alert(id: &str, ts: &str) -> AlertRecord {
        AlertRecord {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            rule_id: "high-heart-rate".to_string(),
            metric_type: "HEART_RATE".to_string(),
            level: "high".to_string(),
            message: "Heart rate above 100 bpm".to_string(),
            value: 120.0,
            timestamp: ts.to_string(),
            handled: false,
        }
    }

    #[tokio::test]
    async fn test_alert_repository_against_sqlite() {
        let pool = create_pool(&DatabaseConfig {
            db_type: DatabaseType::Memory,
            sqlite_path: None,
            ..DatabaseConfig::default()
        })
        .unwrap();
        let repo = AlertRepository::with_pool(pool);

        repo.create(alert("a1", "2024-03-01T08:00:00Z")).await.unwrap();
        repo.create(alert("a2", "2024-03-01T09:00:00Z")).await.unwrap();

        let all = repo
            .list(AlertFilter { user_id: "user-1".to_string(), ..AlertFilter::default() })
            .await
            .unwrap();
        assert_eq!(all.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["a2", "a1"]);

        assert!(repo.mark_handled("user-1", "a1").await.unwrap());
        assert!(!repo.mark_handled("user-1", "missing").await.unwrap());

        assert_eq!(repo.delete_for_user("user-1", true).await.unwrap(), 1);
        assert_eq!(repo.delete_for_user("user-1", false).await.unwrap(), 1);
    }
}
