use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use health_manager_data::models::{
    AlertRecord, HealthRecord as DataHealthRecord, NewHealthRecord, UserRecord,
};

use crate::entities::alert::Alert;
use crate::entities::health_record::{HealthMetricType, HealthRecord};
use crate::entities::user::User;

/// Conversion functions between domain entities and data models
/// These functions follow the pattern convert_to_[target_layer]_[model_name]

/// Helper function to safely parse a string ID to UUID
pub fn parse_string_to_uuid(id: &str) -> Result<Uuid, String> {
    Uuid::parse_str(id).map_err(|_| format!("Invalid UUID format: {}", id))
}

/// Timestamps are stored in one fixed-width UTC form so they sort as strings
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("Invalid RFC 3339 timestamp '{}': {}", raw, e))
}

/// Convert from data model to domain entity for a health record
pub fn convert_to_domain_record(data: DataHealthRecord) -> Result<HealthRecord, String> {
    Ok(HealthRecord {
        metric_type: data.metric_type.parse::<HealthMetricType>()?,
        timestamp: parse_timestamp(&data.timestamp)?,
        created_at: parse_timestamp(&data.created_at)?,
        id: data.id,
        user_id: data.user_id,
        value: data.value,
        secondary_value: data.secondary_value,
        unit: data.unit,
        notes: data.notes,
    })
}

/// Build the data model for a validated measurement
pub fn convert_to_data_new_record(
    user_id: &str,
    metric_type: HealthMetricType,
    value: f64,
    secondary_value: Option<f64>,
    unit: String,
    timestamp: &DateTime<Utc>,
    notes: Option<String>,
) -> NewHealthRecord {
    NewHealthRecord {
        user_id: user_id.to_string(),
        metric_type: metric_type.as_str().to_string(),
        value,
        secondary_value,
        unit,
        timestamp: format_timestamp(timestamp),
        notes,
    }
}

/// Convert from data model to domain entity for a user, dropping the password hash
pub fn convert_to_domain_user(data: UserRecord) -> Result<User, String> {
    let birth_date = data
        .birth_date
        .as_deref()
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| format!("Invalid birth date '{}': {}", raw, e))
        })
        .transpose()?;

    Ok(User {
        birth_date,
        created_at: parse_timestamp(&data.created_at)?,
        updated_at: parse_timestamp(&data.updated_at)?,
        id: data.id,
        email: data.email,
        name: data.name,
        roles: data.roles,
        gender: data.gender,
        height_cm: data.height_cm,
    })
}

/// Convert from data model to domain entity for an alert
pub fn convert_to_domain_alert(data: AlertRecord) -> Result<Alert, String> {
    Ok(Alert {
        metric_type: data.metric_type.parse::<HealthMetricType>()?,
        level: data.level.parse()?,
        timestamp: parse_timestamp(&data.timestamp)?,
        id: data.id,
        user_id: data.user_id,
        rule_id: data.rule_id,
        message: data.message,
        value: data.value,
        handled: data.handled,
    })
}

/// Convert from domain entity to data model for an alert
pub fn convert_to_data_alert(alert: &Alert) -> AlertRecord {
    AlertRecord {
        id: alert.id.clone(),
        user_id: alert.user_id.clone(),
        rule_id: alert.rule_id.clone(),
        metric_type: alert.metric_type.as_str().to_string(),
        level: alert.level.as_str().to_string(),
        message: alert.message.clone(),
        value: alert.value,
        timestamp: format_timestamp(&alert.timestamp),
        handled: alert.handled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::alert::AlertLevel;

    #[test]
    fn test_convert_to_domain_record() {
        let data = DataHealthRecord {
            id: "123e4567-e89b-12d3-a456-426614174000".to_string(),
            user_id: "user-1".to_string(),
            metric_type: "BLOOD_PRESSURE".to_string(),
            value: 128.0,
            secondary_value: Some(84.0),
            unit: "mmHg".to_string(),
            timestamp: "2024-03-01T08:00:00.000Z".to_string(),
            notes: Some("after breakfast".to_string()),
            created_at: "2024-03-01T08:00:05.000Z".to_string(),
        };

        let record = convert_to_domain_record(data.clone()).unwrap();
        assert_eq!(record.metric_type, HealthMetricType::BloodPressure);
        assert_eq!(record.secondary_value, Some(84.0));
        assert_eq!(format_timestamp(&record.timestamp), data.timestamp);

        let broken = DataHealthRecord { metric_type: "MOOD".to_string(), ..data };
        assert!(convert_to_domain_record(broken).is_err());
    }

    #[test]
    fn test_alert_conversion_keeps_fields() {
        let alert = Alert {
            id: "a1".to_string(),
            user_id: "user-1".to_string(),
            rule_id: "low-oxygen".to_string(),
            metric_type: HealthMetricType::BloodOxygen,
            level: AlertLevel::High,
            message: "Blood oxygen below 95%".to_string(),
            value: 91.0,
            timestamp: parse_timestamp("2024-03-01T08:00:00Z").unwrap(),
            handled: false,
        };

        let data = convert_to_data_alert(&alert);
        assert_eq!(data.level, "high");
        assert_eq!(data.metric_type, "BLOOD_OXYGEN");
        assert_eq!(convert_to_domain_alert(data).unwrap(), alert);
    }

    #[test]
    fn test_fixed_width_timestamps_sort_as_strings() {
        let early = format_timestamp(&parse_timestamp("2024-03-01T09:00:00+02:00").unwrap());
        let late = format_timestamp(&parse_timestamp("2024-03-01T08:00:00Z").unwrap());
        assert_eq!(early, "2024-03-01T07:00:00.000Z");
        assert!(early < late);
    }

    #[test]
    fn test_parse_string_to_uuid() {
        assert!(parse_string_to_uuid("not-a-uuid").is_err());
        assert!(parse_string_to_uuid(&Uuid::new_v4().to_string()).is_ok());
    }
}
