use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::{AlertFilter, AlertRecord, HealthRecord, HealthRecordFilter, UserRecord};
use super::errors::RepositoryError;

/// In-memory storage used when the database is not available
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    records: Arc<Mutex<HashMap<String, HealthRecord>>>,
    users: Arc<Mutex<HashMap<String, UserRecord>>>,
    alerts: Arc<Mutex<HashMap<String, AlertRecord>>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    // Health records

    pub async fn store_record(&self, record: &HealthRecord) -> Result<HealthRecord, RepositoryError> {
        let mut store = self.records.lock()?;
        store.insert(record.id.clone(), record.clone());
        Ok(record.clone())
    }

    pub async fn get_record(&self, id: &str) -> Result<Option<HealthRecord>, RepositoryError> {
        let store = self.records.lock()?;
        Ok(store.get(id).cloned())
    }

    pub async fn delete_record(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut store = self.records.lock()?;
        Ok(store.remove(id).is_some())
    }

    pub async fn get_filtered_records(
        &self,
        filter: &HealthRecordFilter,
    ) -> Result<(Vec<HealthRecord>, usize), RepositoryError> {
        let store = self.records.lock()?;
        let sort_desc = filter.sort_desc.unwrap_or(true);

        let mut records: Vec<HealthRecord> = store
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        records.sort_by(|a, b| {
            let cmp = a.timestamp.cmp(&b.timestamp);
            if sort_desc {
                cmp.reverse()
            } else {
                cmp
            }
        });

        let total = records.len();
        let page = records
            .into_iter()
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(total))
            .collect();

        Ok((page, total))
    }

    // Users

    pub async fn store_user(&self, user: &UserRecord) -> Result<UserRecord, RepositoryError> {
        let mut store = self.users.lock()?;
        if store.values().any(|u| u.email == user.email && u.id != user.id) {
            return Err(RepositoryError::Duplicate(format!("email {}", user.email)));
        }
        store.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let store = self.users.lock()?;
        Ok(store.get(id).cloned())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let store = self.users.lock()?;
        Ok(store.values().find(|u| u.email == email).cloned())
    }

    // Alerts

    pub async fn store_alert(&self, alert: &AlertRecord) -> Result<AlertRecord, RepositoryError> {
        let mut store = self.alerts.lock()?;
        store.insert(alert.id.clone(), alert.clone());
        Ok(alert.clone())
    }

    pub async fn get_alerts(&self, filter: &AlertFilter) -> Result<Vec<AlertRecord>, RepositoryError> {
        let store = self.alerts.lock()?;
        let mut alerts: Vec<AlertRecord> = store
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(alerts)
    }

    pub async fn mark_alert_handled(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
        let mut store = self.alerts.lock()?;
        match store.get_mut(id) {
            Some(alert) if alert.user_id == user_id => {
                alert.handled = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn delete_alerts(&self, user_id: &str, handled_only: bool) -> Result<usize, RepositoryError> {
        let mut store = self.alerts.lock()?;
        let before = store.len();
        store.retain(|_, a| !(a.user_id == user_id && (!handled_only || a.handled)));
        Ok(before - store.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, user: &str, metric: &str, ts: &str) -> HealthRecord {
        HealthRecord {
            id: id.to_string(),
            user_id: user.to_string(),
            metric_type: metric.to_string(),
            value: 72.0,
            secondary_value: None,
            unit: "bpm".to_string(),
            timestamp: ts.to_string(),
            notes: None,
            created_at: ts.to_string(),
        }
    }

    #[tokio::test]
    async fn test_filtered_records_are_scoped_sorted_and_paged() {
        let storage = InMemoryStorage::new();
        storage.store_record(&record("1", "u1", "HEART_RATE", "2024-03-01T08:00:00Z")).await.unwrap();
        storage.store_record(&record("2", "u1", "HEART_RATE", "2024-03-02T08:00:00Z")).await.unwrap();
        storage.store_record(&record("3", "u1", "WEIGHT", "2024-03-03T08:00:00Z")).await.unwrap();
        storage.store_record(&record("4", "u2", "HEART_RATE", "2024-03-04T08:00:00Z")).await.unwrap();

        let mut filter = HealthRecordFilter::for_user("u1");
        let (all, total) = storage.get_filtered_records(&filter).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(all[0].id, "3");

        filter.metric_type = Some("HEART_RATE".to_string());
        filter.sort_desc = Some(false);
        filter.limit = Some(1);
        filter.offset = Some(1);
        let (page, total) = storage.get_filtered_records(&filter).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "2");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let storage = InMemoryStorage::new();
        let user = UserRecord {
            id: "u1".to_string(),
            email: "a@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: "A".to_string(),
            roles: vec!["user".to_string()],
            birth_date: None,
            gender: None,
            height_cm: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };
        storage.store_user(&user).await.unwrap();

        // Updating the same user keeps working
        storage.store_user(&user).await.unwrap();

        let other = UserRecord { id: "u2".to_string(), ..user };
        let err = storage.store_user(&other).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_alert_handling_and_cleanup() {
        let storage = InMemoryStorage::new();
        for (id, user) in [("a1", "u1"), ("a2", "u1"), ("a3", "u2")] {
            storage
                .store_alert(&AlertRecord {
                    id: id.to_string(),
                    user_id: user.to_string(),
                    rule_id: "high-heart-rate".to_string(),
                    metric_type: "HEART_RATE".to_string(),
                    level: "high".to_string(),
                    message: "Heart rate too high".to_string(),
                    value: 130.0,
                    timestamp: format!("2024-03-01T08:00:0{}Z", &id[1..]),
                    handled: false,
                })
                .await
                .unwrap();
        }

        // Another user's alert cannot be handled
        assert!(!storage.mark_alert_handled("u1", "a3").await.unwrap());
        assert!(storage.mark_alert_handled("u1", "a1").await.unwrap());

        let active = AlertFilter { user_id: "u1".to_string(), metric_type: None, active_only: true };
        let alerts = storage.get_alerts(&active).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "a2");

        assert_eq!(storage.delete_alerts("u1", true).await.unwrap(), 1);
        assert_eq!(storage.delete_alerts("u1", false).await.unwrap(), 1);
        let rest = AlertFilter { user_id: "u2".to_string(), ..AlertFilter::default() };
        assert_eq!(storage.get_alerts(&rest).await.unwrap().len(), 1);
    }
}
