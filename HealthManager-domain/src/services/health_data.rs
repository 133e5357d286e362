use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use validator::Validate;

use health_manager_data::models::HealthRecordFilter;
use health_manager_data::repository::{HealthRecordRepository, HealthRecordRepositoryTrait, RepositoryError};

use crate::entities::alert::Alert;
use crate::entities::conversions;
use crate::entities::health_record::{CreateHealthRecordRequest, HealthRecord, HealthRecordQuery};
use crate::errors::{AppError, ValidationError};
use crate::services::alerts::AlertServiceTrait;
use crate::services::metrics::{MetricsServiceTrait, HEALTH_RECORDS_CREATED, HEALTH_RECORDS_DELETED};
use crate::services::validation_message;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// How far in the future a measurement timestamp may lie (clock skew)
const MAX_FUTURE_SKEW_MINUTES: i64 = 5;

/// A stored record together with the alerts it raised
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RecordOutcome {
    pub record: HealthRecord,
    pub alerts: Vec<Alert>,
}

/// Trait for health data operations
#[async_trait]
pub trait HealthDataServiceTrait: Send + Sync {
    /// Validate a create request
    fn validate_create_request(&self, request: &CreateHealthRecordRequest) -> Result<(), AppError>;

    /// Validate, store and run alert rules
    async fn record(&self, user_id: &str, request: CreateHealthRecordRequest) -> Result<RecordOutcome, AppError>;

    /// A page of the user's records and the total count
    async fn list(&self, user_id: &str, query: HealthRecordQuery) -> Result<(Vec<HealthRecord>, usize), AppError>;

    /// Every record of the user, oldest first
    async fn all_records(&self, user_id: &str) -> Result<Vec<HealthRecord>, AppError>;

    async fn get(&self, user_id: &str, id: &str) -> Result<HealthRecord, AppError>;

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), AppError>;
}

/// Check a create request against the metric ranges as of `now`
pub fn validate_request_at(request: &CreateHealthRecordRequest, now: DateTime<Utc>) -> Result<(), AppError> {
    let mut failures: Vec<ValidationError> = Vec::new();

    if let Err(errors) = request.validate() {
        failures.push(validation_message(&errors));
    }

    match request.metric_type {
        None => failures.push(ValidationError::required("metric_type")),
        Some(metric_type) => {
            match request.value {
                None => failures.push(ValidationError::required("value")),
                Some(value) if !value.is_finite() => {
                    failures.push(ValidationError::invalid_format("value", "value must be a finite number"))
                }
                Some(value) => {
                    let range = metric_type.accepted_range();
                    if !range.contains(value) {
                        failures.push(ValidationError::out_of_range(
                            "value",
                            format!(
                                "{} must be between {} and {} {}",
                                metric_type.label(),
                                range.min,
                                range.max,
                                metric_type.unit()
                            ),
                        ));
                    }
                }
            }

            match (metric_type.secondary_accepted_range(), request.secondary_value) {
                (Some(_), None) => failures.push(ValidationError::required("secondary_value")),
                (Some(range), Some(diastolic)) => {
                    if !range.contains(diastolic) {
                        failures.push(ValidationError::out_of_range(
                            "secondary_value",
                            format!("diastolic pressure must be between {} and {} mmHg", range.min, range.max),
                        ));
                    } else if matches!(request.value, Some(systolic) if diastolic >= systolic) {
                        failures.push(ValidationError::out_of_range(
                            "secondary_value",
                            "diastolic pressure must be lower than systolic pressure",
                        ));
                    }
                }
                (None, Some(_)) => failures.push(ValidationError::invalid_format(
                    "secondary_value",
                    format!("{} does not take a secondary value", metric_type.label()),
                )),
                (None, None) => {}
            }
        }
    }

    if let Some(raw) = &request.timestamp {
        match conversions::parse_timestamp(raw) {
            Ok(ts) if ts > now + Duration::minutes(MAX_FUTURE_SKEW_MINUTES) => failures.push(
                ValidationError::out_of_range("timestamp", "timestamp cannot be in the future"),
            ),
            Ok(_) => {}
            Err(_) => failures.push(ValidationError::invalid_format(
                "timestamp",
                "timestamp must be an RFC 3339 date-time",
            )),
        }
    }

    match ValidationError::combine(failures) {
        Some(err) => Err(AppError::Validation(err)),
        None => Ok(()),
    }
}

/// Health data service for domain logic
pub struct HealthDataService<R: HealthRecordRepositoryTrait> {
    repository: R,
    alerts: Arc<dyn AlertServiceTrait>,
    metrics: Arc<dyn MetricsServiceTrait>,
}

impl<R: HealthRecordRepositoryTrait> HealthDataService<R> {
    pub fn new(repository: R, alerts: Arc<dyn AlertServiceTrait>, metrics: Arc<dyn MetricsServiceTrait>) -> Self {
        Self { repository, alerts, metrics }
    }

    /// Map repository errors to service errors
    fn map_repo_error(&self, err: RepositoryError) -> AppError {
        error!("Health record repository error: {}", err);
        AppError::from(err)
    }

    /// Fetch a record and check it belongs to the user.
    /// Records of other users are reported as missing.
    async fn owned_record(&self, user_id: &str, id: &str) -> Result<HealthRecord, AppError> {
        let not_found = || AppError::NotFound(format!("Health record {}", id));
        let uuid = conversions::parse_string_to_uuid(id).map_err(|_| not_found())?;

        let data = self
            .repository
            .get_by_id(uuid)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(not_found)?;

        if data.user_id != user_id {
            warn!("User {} asked for record {} owned by someone else", user_id, id);
            return Err(not_found());
        }

        conversions::convert_to_domain_record(data).map_err(AppError::Internal)
    }
}

fn normalize_bound(field: &str, raw: Option<String>) -> Result<Option<String>, AppError> {
    raw.map(|raw| {
        conversions::parse_timestamp(&raw)
            .map(|ts| conversions::format_timestamp(&ts))
            .map_err(|e| AppError::Validation(ValidationError::invalid_format(field, e)))
    })
    .transpose()
}

#[async_trait]
impl<R: HealthRecordRepositoryTrait> HealthDataServiceTrait for HealthDataService<R> {
    fn validate_create_request(&self, request: &CreateHealthRecordRequest) -> Result<(), AppError> {
        validate_request_at(request, Utc::now())
    }

    async fn record(&self, user_id: &str, request: CreateHealthRecordRequest) -> Result<RecordOutcome, AppError> {
        self.validate_create_request(&request)?;

        let (Some(metric_type), Some(value)) = (request.metric_type, request.value) else {
            return Err(AppError::Internal("validated request lost required fields".to_string()));
        };
        let timestamp = match &request.timestamp {
            Some(raw) => conversions::parse_timestamp(raw).map_err(AppError::Internal)?,
            None => Utc::now(),
        };
        let unit = request.unit.unwrap_or_else(|| metric_type.unit().to_string());

        let data_record = conversions::convert_to_data_new_record(
            user_id,
            metric_type,
            value,
            request.secondary_value,
            unit,
            &timestamp,
            request.notes,
        );

        let stored = self
            .repository
            .create(data_record)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        let record = conversions::convert_to_domain_record(stored).map_err(AppError::Internal)?;

        info!("Stored {} record {} for user {}", record.metric_type, record.id, user_id);
        self.metrics.increment(HEALTH_RECORDS_CREATED);

        // The record is already stored, a failing alert check must not lose it
        let alerts = match self.alerts.check_record(&record).await {
            Ok(alerts) => alerts,
            Err(e) => {
                error!("Alert check failed for record {}: {}", record.id, e);
                Vec::new()
            }
        };

        Ok(RecordOutcome { record, alerts })
    }

    async fn list(&self, user_id: &str, query: HealthRecordQuery) -> Result<(Vec<HealthRecord>, usize), AppError> {
        let filter = HealthRecordFilter {
            user_id: user_id.to_string(),
            metric_type: query.metric_type.map(|t| t.as_str().to_string()),
            start_date: normalize_bound("start_date", query.start_date)?,
            end_date: normalize_bound("end_date", query.end_date)?,
            limit: query.limit,
            offset: query.offset,
            sort_desc: query.sort_desc,
        };

        let (data_records, total) = self
            .repository
            .get_filtered(filter)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        let records = data_records
            .into_iter()
            .map(conversions::convert_to_domain_record)
            .collect::<Result<Vec<HealthRecord>, String>>()
            .map_err(AppError::Internal)?;

        Ok((records, total))
    }

    async fn all_records(&self, user_id: &str) -> Result<Vec<HealthRecord>, AppError> {
        let query = HealthRecordQuery {
            sort_desc: Some(false),
            ..HealthRecordQuery::default()
        };
        let (records, _) = self.list(user_id, query).await?;
        Ok(records)
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<HealthRecord, AppError> {
        self.owned_record(user_id, id).await
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), AppError> {
        let record = self.owned_record(user_id, id).await?;
        let uuid = conversions::parse_string_to_uuid(&record.id).map_err(AppError::Internal)?;

        let deleted = self
            .repository
            .delete(uuid)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        if !deleted {
            return Err(AppError::NotFound(format!("Health record {}", id)));
        }

        info!("Deleted record {} for user {}", id, user_id);
        self.metrics.increment(HEALTH_RECORDS_DELETED);
        Ok(())
    }
}

/// Create a default health data service using the repository from data layer
pub fn create_default_health_data_service(
    alerts: Arc<dyn AlertServiceTrait>,
    metrics: Arc<dyn MetricsServiceTrait>,
) -> impl HealthDataServiceTrait {
    HealthDataService::new(HealthRecordRepository::new(), alerts, metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::health_record::HealthMetricType;
    use crate::errors::ValidationCode;
    use crate::services::alerts::AlertService;
    use crate::services::metrics::MetricsService;
    use health_manager_data::repository::mocks::{MockAlertRepository, MockHealthRecordRepository};

    fn service_with(repository: MockHealthRecordRepository) -> (HealthDataService<MockHealthRecordRepository>, Arc<MetricsService>) {
        let metrics = Arc::new(MetricsService::new());
        let alerts = Arc::new(AlertService::new(MockAlertRepository::new(), metrics.clone()));
        (HealthDataService::new(repository, alerts, metrics.clone()), metrics)
    }

    fn request(metric_type: HealthMetricType, value: f64) -> CreateHealthRecordRequest {
        CreateHealthRecordRequest {
            metric_type: Some(metric_type),
            value: Some(value),
            timestamp: Some("2024-03-01T08:00:00Z".to_string()),
            ..CreateHealthRecordRequest::default()
        }
    }

    fn validation_error(result: Result<(), AppError>) -> ValidationError {
        match result {
            Err(AppError::Validation(err)) => err,
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_requests_pass() {
        let now = Utc::now();
        assert!(validate_request_at(&request(HealthMetricType::HeartRate, 72.0), now).is_ok());
        assert!(validate_request_at(&request(HealthMetricType::Steps, 0.0), now).is_ok());

        let mut bp = request(HealthMetricType::BloodPressure, 120.0);
        bp.secondary_value = Some(80.0);
        assert!(validate_request_at(&bp, now).is_ok());
    }

    #[test]
    fn test_out_of_range_value() {
        let err = validation_error(validate_request_at(&request(HealthMetricType::HeartRate, 250.0), Utc::now()));
        assert_eq!(err.code, ValidationCode::ValueOutOfRange);
        assert_eq!(err.field.as_deref(), Some("value"));
        assert!(err.message.contains("between 40 and 200"));

        let err = validation_error(validate_request_at(&request(HealthMetricType::Weight, 0.0), Utc::now()));
        assert_eq!(err.code, ValidationCode::ValueOutOfRange);
    }

    #[test]
    fn test_missing_fields_are_reported_first() {
        let empty = CreateHealthRecordRequest::default();
        let err = validation_error(validate_request_at(&empty, Utc::now()));
        assert_eq!(err.code, ValidationCode::RequiredFieldMissing);
        assert_eq!(err.field.as_deref(), Some("metric_type"));

        let no_value = CreateHealthRecordRequest {
            metric_type: Some(HealthMetricType::BloodSugar),
            ..CreateHealthRecordRequest::default()
        };
        let err = validation_error(validate_request_at(&no_value, Utc::now()));
        assert_eq!(err.field.as_deref(), Some("value"));
    }

    #[test]
    fn test_blood_pressure_rules() {
        let now = Utc::now();
        let missing = validation_error(validate_request_at(&request(HealthMetricType::BloodPressure, 120.0), now));
        assert_eq!(missing.field.as_deref(), Some("secondary_value"));
        assert_eq!(missing.code, ValidationCode::RequiredFieldMissing);

        let mut inverted = request(HealthMetricType::BloodPressure, 90.0);
        inverted.secondary_value = Some(95.0);
        let err = validation_error(validate_request_at(&inverted, now));
        assert!(err.message.contains("lower than systolic"));

        let mut stray = request(HealthMetricType::HeartRate, 70.0);
        stray.secondary_value = Some(10.0);
        let err = validation_error(validate_request_at(&stray, now));
        assert_eq!(err.code, ValidationCode::InvalidFormat);
    }

    #[test]
    fn test_timestamp_rules() {
        let now = Utc::now();
        let mut future = request(HealthMetricType::HeartRate, 70.0);
        future.timestamp = Some(conversions::format_timestamp(&(now + Duration::minutes(10))));
        let err = validation_error(validate_request_at(&future, now));
        assert_eq!(err.field.as_deref(), Some("timestamp"));

        let mut skewed = request(HealthMetricType::HeartRate, 70.0);
        skewed.timestamp = Some(conversions::format_timestamp(&(now + Duration::minutes(4))));
        assert!(validate_request_at(&skewed, now).is_ok());

        let mut garbage = request(HealthMetricType::HeartRate, 70.0);
        garbage.timestamp = Some("yesterday".to_string());
        let err = validation_error(validate_request_at(&garbage, now));
        assert_eq!(err.code, ValidationCode::InvalidFormat);
    }

    #[test]
    fn test_multiple_failures_are_joined() {
        let mut req = request(HealthMetricType::HeartRate, 20.0);
        req.timestamp = Some("soon".to_string());
        let err = validation_error(validate_request_at(&req, Utc::now()));
        assert_eq!(err.field.as_deref(), Some("value"));
        assert!(err.message.contains("; timestamp:"));
    }

    #[tokio::test]
    async fn test_record_stores_counts_and_alerts() {
        let (service, metrics) = service_with(MockHealthRecordRepository::new());

        let outcome = service.record("user-1", request(HealthMetricType::HeartRate, 130.0)).await.unwrap();
        assert_eq!(outcome.record.unit, "bpm");
        assert_eq!(outcome.record.user_id, "user-1");
        assert_eq!(outcome.alerts.len(), 1);
        assert_eq!(outcome.alerts[0].rule_id, "high-heart-rate");
        assert_eq!(metrics.get(HEALTH_RECORDS_CREATED), 1);

        let calm = service.record("user-1", request(HealthMetricType::HeartRate, 72.0)).await.unwrap();
        assert!(calm.alerts.is_empty());
        assert_eq!(metrics.get(HEALTH_RECORDS_CREATED), 2);
    }

    #[tokio::test]
    async fn test_records_of_other_users_are_not_found() {
        let (service, _) = service_with(MockHealthRecordRepository::new());
        let outcome = service.record("owner", request(HealthMetricType::Weight, 70.0)).await.unwrap();
        let id = outcome.record.id.clone();

        assert_eq!(service.get("owner", &id).await.unwrap(), outcome.record);
        assert!(matches!(service.get("intruder", &id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.delete("intruder", &id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.get("owner", "not-a-uuid").await, Err(AppError::NotFound(_))));

        service.delete("owner", &id).await.unwrap();
        assert!(matches!(service.get("owner", &id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let (service, _) = service_with(MockHealthRecordRepository::new());
        for (i, value) in [70.0, 72.0, 74.0].iter().enumerate() {
            let mut req = request(HealthMetricType::HeartRate, *value);
            req.timestamp = Some(format!("2024-03-0{}T08:00:00Z", i + 1));
            service.record("user-1", req).await.unwrap();
        }
        service.record("user-1", request(HealthMetricType::Weight, 70.0)).await.unwrap();

        let query = HealthRecordQuery {
            metric_type: Some(HealthMetricType::HeartRate),
            limit: Some(2),
            ..HealthRecordQuery::default()
        };
        let (page, total) = service.list("user-1", query).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].value, 74.0);

        let ranged = HealthRecordQuery {
            start_date: Some("2024-03-02T00:00:00+00:00".to_string()),
            end_date: Some("2024-03-02T23:59:59Z".to_string()),
            ..HealthRecordQuery::default()
        };
        let (records, _) = service.list("user-1", ranged).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, 72.0);

        let all = service.all_records("user-1").await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let bad = HealthRecordQuery {
            start_date: Some("last week".to_string()),
            ..HealthRecordQuery::default()
        };
        assert!(matches!(service.list("user-1", bad).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_repository_failure_is_internal() {
        let (service, metrics) = service_with(MockHealthRecordRepository::failing());
        let result = service.record("user-1", request(HealthMetricType::HeartRate, 70.0)).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(metrics.get(HEALTH_RECORDS_CREATED), 0);
    }
}
