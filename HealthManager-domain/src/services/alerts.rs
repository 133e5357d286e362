use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use health_manager_data::models::AlertFilter;
use health_manager_data::repository::{AlertRepository, AlertRepositoryTrait, RepositoryError};

use crate::entities::alert::{Alert, AlertCondition, AlertLevel, AlertRule, AlertRuleRequest, DEFAULT_COOLDOWN_MS};
use crate::entities::conversions;
use crate::entities::health_record::{HealthMetricType, HealthRecord};
use crate::errors::AppError;
use crate::services::metrics::{MetricsServiceTrait, ALERTS_TRIGGERED};
use crate::services::validation_message;

/// Trait for risk alert operations
#[async_trait]
pub trait AlertServiceTrait: Send + Sync {
    /// Run the enabled rules against a freshly stored record
    async fn check_record(&self, record: &HealthRecord) -> Result<Vec<Alert>, AppError>;

    /// A user's alerts, newest first
    async fn list(
        &self,
        user_id: &str,
        metric_type: Option<HealthMetricType>,
        active_only: bool,
    ) -> Result<Vec<Alert>, AppError>;

    async fn mark_handled(&self, user_id: &str, alert_id: &str) -> Result<(), AppError>;

    /// Remove handled alerts, returning how many were removed
    async fn clear_handled(&self, user_id: &str) -> Result<usize, AppError>;

    async fn clear_all(&self, user_id: &str) -> Result<usize, AppError>;

    fn rules(&self) -> Vec<AlertRule>;

    fn add_rule(&self, request: AlertRuleRequest) -> Result<AlertRule, AppError>;

    fn update_rule(&self, id: &str, request: AlertRuleRequest) -> Result<AlertRule, AppError>;

    fn remove_rule(&self, id: &str) -> Result<(), AppError>;

    /// Restore the default rules and forget every cooldown
    fn reset(&self);
}

/// The rules every installation starts with
pub fn default_rules() -> Vec<AlertRule> {
    let rule = |id: &str, name: &str, metric_type, conditions, message: &str| AlertRule {
        id: id.to_string(),
        name: name.to_string(),
        metric_type,
        conditions,
        level: AlertLevel::High,
        message: message.to_string(),
        cooldown_ms: DEFAULT_COOLDOWN_MS,
        enabled: true,
    };

    vec![
        rule(
            "high-heart-rate",
            "High heart rate",
            HealthMetricType::HeartRate,
            vec![AlertCondition::above(100.0)],
            "Heart rate is above 100 bpm",
        ),
        rule(
            "low-heart-rate",
            "Low heart rate",
            HealthMetricType::HeartRate,
            vec![AlertCondition::below(60.0)],
            "Heart rate is below 60 bpm",
        ),
        rule(
            "high-blood-pressure",
            "High blood pressure",
            HealthMetricType::BloodPressure,
            vec![AlertCondition::above(140.0), AlertCondition::secondary_above(90.0)],
            "Blood pressure is above 140/90 mmHg",
        ),
        rule(
            "low-blood-oxygen",
            "Low blood oxygen",
            HealthMetricType::BloodOxygen,
            vec![AlertCondition::below(95.0)],
            "Blood oxygen saturation is below 95%",
        ),
    ]
}

/// Alert service backed by an alert repository
pub struct AlertService<R: AlertRepositoryTrait> {
    repository: R,
    metrics: Arc<dyn MetricsServiceTrait>,
    rules: RwLock<Vec<AlertRule>>,
    /// Last firing per (user, rule)
    cooldowns: RwLock<HashMap<(String, String), DateTime<Utc>>>,
}

impl<R: AlertRepositoryTrait> AlertService<R> {
    pub fn new(repository: R, metrics: Arc<dyn MetricsServiceTrait>) -> Self {
        Self {
            repository,
            metrics,
            rules: RwLock::new(default_rules()),
            cooldowns: RwLock::new(HashMap::new()),
        }
    }

    fn map_repo_error(&self, err: RepositoryError) -> AppError {
        error!("Alert repository error: {}", err);
        AppError::from(err)
    }

    /// Rules that fire for the record at `now`, claiming their cooldown slot.
    /// Each claim carries the firing it replaced so it can be released.
    fn triggered_rules(&self, record: &HealthRecord, now: DateTime<Utc>) -> Vec<(AlertRule, f64, Option<DateTime<Utc>>)> {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        let mut cooldowns = self.cooldowns.write().unwrap_or_else(PoisonError::into_inner);

        let mut fired = Vec::new();
        for rule in rules.iter() {
            let Some(value) = rule.evaluate(record) else {
                continue;
            };

            let key = (record.user_id.clone(), rule.id.clone());
            let cooldown = Duration::milliseconds(rule.effective_cooldown_ms().min(i64::MAX as u64) as i64);
            if let Some(last) = cooldowns.get(&key) {
                if now - *last < cooldown {
                    debug!("Rule {} for user {} still cooling down", rule.id, record.user_id);
                    continue;
                }
            }

            let previous = cooldowns.insert(key, now);
            fired.push((rule.clone(), value, previous));
        }
        fired
    }

    /// Undo a cooldown claim whose alert was never stored
    fn release_cooldown(&self, user_id: &str, rule_id: &str, claimed: DateTime<Utc>, previous: Option<DateTime<Utc>>) {
        let mut cooldowns = self.cooldowns.write().unwrap_or_else(PoisonError::into_inner);
        let key = (user_id.to_string(), rule_id.to_string());

        // A concurrent check may have claimed the slot since
        if cooldowns.get(&key) != Some(&claimed) {
            return;
        }
        match previous {
            Some(last) => {
                cooldowns.insert(key, last);
            }
            None => {
                cooldowns.remove(&key);
            }
        }
    }

    /// `check_record` with an explicit clock.
    ///
    /// A rule whose alert cannot be stored does not start its cooldown. The
    /// alerts that were stored are returned; the error is only surfaced when
    /// none were.
    pub async fn check_record_at(
        &self,
        record: &HealthRecord,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>, AppError> {
        let mut alerts = Vec::new();
        let mut failure = None;

        for (rule, value, previous) in self.triggered_rules(record, now) {
            let alert = Alert {
                id: Uuid::new_v4().to_string(),
                user_id: record.user_id.clone(),
                rule_id: rule.id.clone(),
                metric_type: rule.metric_type,
                level: rule.level,
                message: rule.message.clone(),
                value,
                timestamp: now,
                handled: false,
            };

            if let Err(e) = self
                .repository
                .create(conversions::convert_to_data_alert(&alert))
                .await
            {
                self.release_cooldown(&alert.user_id, &alert.rule_id, now, previous);
                failure = Some(self.map_repo_error(e));
                continue;
            }

            warn!(
                "Alert {} ({}) raised for user {}: {}",
                alert.rule_id, alert.level, alert.user_id, alert.message
            );
            self.metrics.increment(ALERTS_TRIGGERED);
            alerts.push(alert);
        }

        match failure {
            Some(err) if alerts.is_empty() => Err(err),
            _ => Ok(alerts),
        }
    }

    fn rule_from_request(id: String, request: AlertRuleRequest) -> Result<AlertRule, AppError> {
        if let Err(errors) = request.validate() {
            return Err(AppError::Validation(validation_message(&errors)));
        }
        Ok(AlertRule {
            id,
            name: request.name,
            metric_type: request.metric_type,
            conditions: request.conditions,
            level: request.level,
            message: request.message,
            cooldown_ms: request.cooldown_ms,
            enabled: request.enabled,
        })
    }
}

#[async_trait]
impl<R: AlertRepositoryTrait> AlertServiceTrait for AlertService<R> {
    async fn check_record(&self, record: &HealthRecord) -> Result<Vec<Alert>, AppError> {
        self.check_record_at(record, Utc::now()).await
    }

    async fn list(
        &self,
        user_id: &str,
        metric_type: Option<HealthMetricType>,
        active_only: bool,
    ) -> Result<Vec<Alert>, AppError> {
        let filter = AlertFilter {
            user_id: user_id.to_string(),
            metric_type: metric_type.map(|t| t.as_str().to_string()),
            active_only,
        };

        let records = self.repository.list(filter).await.map_err(|e| self.map_repo_error(e))?;
        let mut alerts = records
            .into_iter()
            .map(conversions::convert_to_domain_alert)
            .collect::<Result<Vec<Alert>, String>>()
            .map_err(AppError::Internal)?;
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(alerts)
    }

    async fn mark_handled(&self, user_id: &str, alert_id: &str) -> Result<(), AppError> {
        let found = self
            .repository
            .mark_handled(user_id, alert_id)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        if found {
            info!("Alert {} handled by user {}", alert_id, user_id);
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Alert {}", alert_id)))
        }
    }

    async fn clear_handled(&self, user_id: &str) -> Result<usize, AppError> {
        self.repository
            .delete_for_user(user_id, true)
            .await
            .map_err(|e| self.map_repo_error(e))
    }

    async fn clear_all(&self, user_id: &str) -> Result<usize, AppError> {
        self.repository
            .delete_for_user(user_id, false)
            .await
            .map_err(|e| self.map_repo_error(e))
    }

    fn rules(&self) -> Vec<AlertRule> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn add_rule(&self, mut request: AlertRuleRequest) -> Result<AlertRule, AppError> {
        let id = request
            .id
            .take()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let rule = Self::rule_from_request(id, request)?;

        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        if rules.iter().any(|r| r.id == rule.id) {
            return Err(AppError::Conflict(format!("Alert rule {} already exists", rule.id)));
        }
        info!("Adding alert rule {}", rule.id);
        rules.push(rule.clone());
        Ok(rule)
    }

    fn update_rule(&self, id: &str, request: AlertRuleRequest) -> Result<AlertRule, AppError> {
        let rule = Self::rule_from_request(id.to_string(), request)?;

        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let existing = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Alert rule {}", id)))?;
        *existing = rule.clone();
        info!("Updated alert rule {}", id);
        Ok(rule)
    }

    fn remove_rule(&self, id: &str) -> Result<(), AppError> {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let before = rules.len();
        rules.retain(|r| r.id != id);
        if rules.len() == before {
            return Err(AppError::NotFound(format!("Alert rule {}", id)));
        }
        info!("Removed alert rule {}", id);
        Ok(())
    }

    fn reset(&self) {
        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = default_rules();
        self.cooldowns.write().unwrap_or_else(PoisonError::into_inner).clear();
        info!("Alert rules reset to defaults");
    }
}

/// Create a default alert service using the repository from data layer
pub fn create_default_alert_service(
    metrics: Arc<dyn MetricsServiceTrait>,
) -> impl AlertServiceTrait {
    AlertService::new(AlertRepository::new(), metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::metrics::MetricsService;
    use health_manager_data::models::AlertRecord;
    use health_manager_data::repository::mocks::MockAlertRepository;

    fn new_service() -> (AlertService<MockAlertRepository>, Arc<MetricsService>) {
        let metrics = Arc::new(MetricsService::new());
        (AlertService::new(MockAlertRepository::new(), metrics.clone()), metrics)
    }

    fn record(metric_type: HealthMetricType, value: f64, secondary: Option<f64>) -> HealthRecord {
        let now = Utc::now();
        HealthRecord {
            id: Uuid::new_v4().to_string(),
            user_id: "user-1".to_string(),
            metric_type,
            value,
            secondary_value: secondary,
            unit: metric_type.unit().to_string(),
            timestamp: now,
            notes: None,
            created_at: now,
        }
    }

    fn rule_request(id: Option<&str>) -> AlertRuleRequest {
        AlertRuleRequest {
            id: id.map(String::from),
            name: "High blood sugar".to_string(),
            metric_type: HealthMetricType::BloodSugar,
            conditions: vec![AlertCondition::above(11.0)],
            level: AlertLevel::Medium,
            message: "Blood sugar is above 11 mmol/L".to_string(),
            cooldown_ms: 0,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_high_heart_rate_triggers_once_within_cooldown() {
        let (service, metrics) = new_service();
        let now = Utc::now();

        let alerts = service
            .check_record_at(&record(HealthMetricType::HeartRate, 130.0, None), now)
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule_id, "high-heart-rate");
        assert_eq!(alerts[0].level, AlertLevel::High);
        assert!(!alerts[0].handled);

        let again = service
            .check_record_at(&record(HealthMetricType::HeartRate, 135.0, None), now + Duration::seconds(299))
            .await
            .unwrap();
        assert!(again.is_empty());

        let later = service
            .check_record_at(&record(HealthMetricType::HeartRate, 135.0, None), now + Duration::seconds(300))
            .await
            .unwrap();
        assert_eq!(later.len(), 1);
        assert_eq!(metrics.get(ALERTS_TRIGGERED), 2);
    }

    /// Fails the first `failures` creates, then stores normally
    struct UnreliableAlertRepository {
        inner: MockAlertRepository,
        failures: std::sync::atomic::AtomicUsize,
    }

    impl UnreliableAlertRepository {
        fn new(failures: usize) -> Self {
            Self {
                inner: MockAlertRepository::new(),
                failures: std::sync::atomic::AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl AlertRepositoryTrait for UnreliableAlertRepository {
        async fn create(&self, alert: AlertRecord) -> Result<AlertRecord, RepositoryError> {
            use std::sync::atomic::Ordering;
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(RepositoryError::Lock("storage unavailable".to_string()));
            }
            self.inner.create(alert).await
        }

        async fn list(&self, filter: AlertFilter) -> Result<Vec<AlertRecord>, RepositoryError> {
            self.inner.list(filter).await
        }

        async fn mark_handled(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
            self.inner.mark_handled(user_id, id).await
        }

        async fn delete_for_user(&self, user_id: &str, handled_only: bool) -> Result<usize, RepositoryError> {
            self.inner.delete_for_user(user_id, handled_only).await
        }
    }

    #[tokio::test]
    async fn test_failed_store_does_not_start_cooldown() {
        let metrics = Arc::new(MetricsService::new());
        let service = AlertService::new(UnreliableAlertRepository::new(1), metrics.clone());
        let now = Utc::now();

        let first = service
            .check_record_at(&record(HealthMetricType::HeartRate, 130.0, None), now)
            .await;
        assert!(matches!(first, Err(AppError::Internal(_))));

        let retried = service
            .check_record_at(&record(HealthMetricType::HeartRate, 130.0, None), now + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].rule_id, "high-heart-rate");
        assert_eq!(metrics.get(ALERTS_TRIGGERED), 1);

        // The stored alert does start the cooldown
        let suppressed = service
            .check_record_at(&record(HealthMetricType::HeartRate, 130.0, None), now + Duration::seconds(20))
            .await
            .unwrap();
        assert!(suppressed.is_empty());
    }

    #[tokio::test]
    async fn test_partial_store_failure_keeps_stored_alerts() {
        let metrics = Arc::new(MetricsService::new());
        let service = AlertService::new(UnreliableAlertRepository::new(1), metrics);
        let mut racing = rule_request(Some("very-high-heart-rate"));
        racing.metric_type = HealthMetricType::HeartRate;
        racing.conditions = vec![AlertCondition::above(120.0)];
        service.add_rule(racing).unwrap();

        // Two rules fire: the first store fails, the second succeeds
        let now = Utc::now();
        let alerts = service
            .check_record_at(&record(HealthMetricType::HeartRate, 130.0, None), now)
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule_id, "very-high-heart-rate");

        let retried = service
            .check_record_at(&record(HealthMetricType::HeartRate, 130.0, None), now + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].rule_id, "high-heart-rate");
    }

    #[tokio::test]
    async fn test_zero_cooldown_uses_default() {
        let (service, _) = new_service();
        service.add_rule(rule_request(Some("sugar"))).unwrap();
        let now = Utc::now();

        let first = service
            .check_record_at(&record(HealthMetricType::BloodSugar, 12.5, None), now)
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let within = service
            .check_record_at(&record(HealthMetricType::BloodSugar, 12.5, None), now + Duration::seconds(60))
            .await
            .unwrap();
        assert!(within.is_empty());
    }

    #[tokio::test]
    async fn test_blood_pressure_rule_matches_diastolic() {
        let (service, _) = new_service();
        let alerts = service
            .check_record(&record(HealthMetricType::BloodPressure, 130.0, Some(95.0)))
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].value, 95.0);

        let (service, _) = new_service();
        let normal = service
            .check_record(&record(HealthMetricType::BloodPressure, 120.0, Some(80.0)))
            .await
            .unwrap();
        assert!(normal.is_empty());
    }

    #[tokio::test]
    async fn test_list_and_handle_alerts() {
        let (service, _) = new_service();
        service.check_record(&record(HealthMetricType::HeartRate, 45.0, None)).await.unwrap();
        service.check_record(&record(HealthMetricType::BloodOxygen, 90.0, None)).await.unwrap();

        let all = service.list("user-1", None, false).await.unwrap();
        assert_eq!(all.len(), 2);

        service.mark_handled("user-1", &all[0].id).await.unwrap();
        let active = service.list("user-1", None, true).await.unwrap();
        assert_eq!(active.len(), 1);

        let missing = service.mark_handled("user-2", &all[1].id).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let oxygen = service.list("user-1", Some(HealthMetricType::BloodOxygen), false).await.unwrap();
        assert_eq!(oxygen.len(), 1);

        assert_eq!(service.clear_handled("user-1").await.unwrap(), 1);
        assert_eq!(service.clear_all("user-1").await.unwrap(), 1);
        assert!(service.list("user-1", None, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rule_management() {
        let (service, _) = new_service();
        assert_eq!(service.rules().len(), 4);

        let added = service.add_rule(rule_request(None)).unwrap();
        assert!(Uuid::parse_str(&added.id).is_ok());
        assert!(matches!(
            service.add_rule(rule_request(Some(&added.id))),
            Err(AppError::Conflict(_))
        ));

        let alerts = service.check_record(&record(HealthMetricType::BloodSugar, 12.5, None)).await.unwrap();
        assert_eq!(alerts.len(), 1);

        let mut disabled = rule_request(None);
        disabled.enabled = false;
        service.update_rule(&added.id, disabled).unwrap();
        let alerts = service.check_record(&record(HealthMetricType::BloodSugar, 12.5, None)).await.unwrap();
        assert!(alerts.is_empty());

        service.remove_rule(&added.id).unwrap();
        assert!(matches!(service.remove_rule(&added.id), Err(AppError::NotFound(_))));

        service.remove_rule("low-heart-rate").unwrap();
        service.reset();
        assert_eq!(service.rules(), default_rules());
    }

    #[test]
    fn test_rule_without_conditions_is_rejected() {
        let (service, _) = new_service();
        let mut request = rule_request(Some("empty"));
        request.conditions.clear();
        assert!(matches!(service.add_rule(request), Err(AppError::Validation(_))));
    }
}
