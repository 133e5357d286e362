use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::{IntoParams, ToSchema};

/// Kinds of measurement a user can record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthMetricType {
    /// Systolic in `value`, diastolic in `secondary_value`
    BloodPressure,
    HeartRate,
    BloodSugar,
    BodyTemperature,
    Weight,
    Height,
    BloodOxygen,
    Steps,
    SleepDuration,
}

/// Closed interval of acceptable values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    /// Zero itself is rejected (body measurements)
    pub min_exclusive: bool,
}

impl ValueRange {
    const fn new(min: f64, max: f64) -> Self {
        Self { min, max, min_exclusive: false }
    }

    const fn positive(max: f64) -> Self {
        Self { min: 0.0, max, min_exclusive: true }
    }

    pub fn contains(&self, value: f64) -> bool {
        let above_min = if self.min_exclusive { value > self.min } else { value >= self.min };
        above_min && value <= self.max
    }
}

impl HealthMetricType {
    pub const ALL: [HealthMetricType; 9] = [
        HealthMetricType::BloodPressure,
        HealthMetricType::HeartRate,
        HealthMetricType::BloodSugar,
        HealthMetricType::BodyTemperature,
        HealthMetricType::Weight,
        HealthMetricType::Height,
        HealthMetricType::BloodOxygen,
        HealthMetricType::Steps,
        HealthMetricType::SleepDuration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthMetricType::BloodPressure => "BLOOD_PRESSURE",
            HealthMetricType::HeartRate => "HEART_RATE",
            HealthMetricType::BloodSugar => "BLOOD_SUGAR",
            HealthMetricType::BodyTemperature => "BODY_TEMPERATURE",
            HealthMetricType::Weight => "WEIGHT",
            HealthMetricType::Height => "HEIGHT",
            HealthMetricType::BloodOxygen => "BLOOD_OXYGEN",
            HealthMetricType::Steps => "STEPS",
            HealthMetricType::SleepDuration => "SLEEP_DURATION",
        }
    }

    /// Human-readable name used in messages
    pub fn label(&self) -> &'static str {
        match self {
            HealthMetricType::BloodPressure => "blood pressure",
            HealthMetricType::HeartRate => "heart rate",
            HealthMetricType::BloodSugar => "blood sugar",
            HealthMetricType::BodyTemperature => "body temperature",
            HealthMetricType::Weight => "weight",
            HealthMetricType::Height => "height",
            HealthMetricType::BloodOxygen => "blood oxygen",
            HealthMetricType::Steps => "steps",
            HealthMetricType::SleepDuration => "sleep duration",
        }
    }

    /// Default unit for the metric
    pub fn unit(&self) -> &'static str {
        match self {
            HealthMetricType::BloodPressure => "mmHg",
            HealthMetricType::HeartRate => "bpm",
            HealthMetricType::BloodSugar => "mmol/L",
            HealthMetricType::BodyTemperature => "°C",
            HealthMetricType::Weight => "kg",
            HealthMetricType::Height => "cm",
            HealthMetricType::BloodOxygen => "%",
            HealthMetricType::Steps => "steps",
            HealthMetricType::SleepDuration => "hours",
        }
    }

    /// Values accepted when recording a measurement.
    /// For blood pressure this is the systolic range.
    pub fn accepted_range(&self) -> ValueRange {
        match self {
            HealthMetricType::BloodPressure => ValueRange::new(70.0, 200.0),
            HealthMetricType::HeartRate => ValueRange::new(40.0, 200.0),
            HealthMetricType::BloodSugar => ValueRange::new(1.0, 35.0),
            HealthMetricType::BodyTemperature => ValueRange::new(35.0, 42.0),
            HealthMetricType::Weight => ValueRange::positive(500.0),
            HealthMetricType::Height => ValueRange::positive(300.0),
            HealthMetricType::BloodOxygen => ValueRange::new(80.0, 100.0),
            HealthMetricType::Steps => ValueRange::new(0.0, 100_000.0),
            HealthMetricType::SleepDuration => ValueRange::new(0.0, 24.0),
        }
    }

    /// Diastolic range, only blood pressure has a secondary value
    pub fn secondary_accepted_range(&self) -> Option<ValueRange> {
        match self {
            HealthMetricType::BloodPressure => Some(ValueRange::new(40.0, 130.0)),
            _ => None,
        }
    }

    /// Healthy range used by analysis
    pub fn normal_range(&self) -> ValueRange {
        match self {
            HealthMetricType::BloodPressure => ValueRange::new(90.0, 140.0),
            HealthMetricType::HeartRate => ValueRange::new(60.0, 100.0),
            HealthMetricType::BloodSugar => ValueRange::new(3.9, 6.1),
            HealthMetricType::BodyTemperature => ValueRange::new(36.0, 37.5),
            HealthMetricType::Weight => ValueRange::new(40.0, 120.0),
            HealthMetricType::Height => ValueRange::new(50.0, 250.0),
            HealthMetricType::BloodOxygen => ValueRange::new(95.0, 100.0),
            HealthMetricType::Steps => ValueRange::new(8000.0, 100_000.0),
            HealthMetricType::SleepDuration => ValueRange::new(7.0, 9.0),
        }
    }

    /// Upper bound of a healthy diastolic pressure
    pub fn secondary_normal_max(&self) -> Option<f64> {
        match self {
            HealthMetricType::BloodPressure => Some(90.0),
            _ => None,
        }
    }

    /// Weight of the metric in the overall health score
    pub fn weight(&self) -> f64 {
        match self {
            HealthMetricType::BloodPressure => 0.30,
            HealthMetricType::HeartRate => 0.20,
            HealthMetricType::BloodSugar => 0.20,
            HealthMetricType::BodyTemperature => 0.15,
            HealthMetricType::Weight => 0.10,
            HealthMetricType::Height => 0.05,
            HealthMetricType::BloodOxygen => 0.10,
            HealthMetricType::Steps => 0.10,
            HealthMetricType::SleepDuration => 0.10,
        }
    }

    /// Vital signs with a clinical range, used for the daily health score
    pub fn is_vital_sign(&self) -> bool {
        matches!(
            self,
            HealthMetricType::BloodPressure
                | HealthMetricType::HeartRate
                | HealthMetricType::BloodSugar
                | HealthMetricType::BodyTemperature
                | HealthMetricType::BloodOxygen
        )
    }
}

impl fmt::Display for HealthMetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HealthMetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HealthMetricType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown metric type: {}", s))
    }
}

/// Domain model for a recorded measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HealthRecord {
    pub id: String,
    pub user_id: String,
    pub metric_type: HealthMetricType,
    /// Primary value (systolic for blood pressure)
    pub value: f64,
    /// Diastolic for blood pressure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_value: Option<f64>,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HealthRecord {
    /// Whether the primary value lies in the metric's normal range
    pub fn is_in_normal_range(&self) -> bool {
        let primary = self.metric_type.normal_range().contains(self.value);
        let secondary = match (self.metric_type.secondary_normal_max(), self.secondary_value) {
            (Some(max), Some(v)) => v <= max,
            _ => true,
        };
        primary && secondary
    }
}

/// Request payload for recording a measurement
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateHealthRecordRequest {
    /// Metric being recorded
    pub metric_type: Option<HealthMetricType>,

    /// Primary value (systolic for blood pressure)
    pub value: Option<f64>,

    /// Diastolic pressure, required for blood pressure only
    pub secondary_value: Option<f64>,

    /// Unit, defaults to the metric's unit
    #[validate(length(min = 1, max = 20, message = "Unit must be between 1 and 20 characters"))]
    pub unit: Option<String>,

    /// When the measurement was taken (RFC 3339). Defaults to the current time.
    pub timestamp: Option<String>,

    /// Optional notes about the measurement
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

/// Filters for listing a user's records
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "with-api", derive(IntoParams, ToSchema))]
pub struct HealthRecordQuery {
    /// Only records of this metric
    pub metric_type: Option<HealthMetricType>,
    /// Inclusive RFC 3339 lower bound
    pub start_date: Option<String>,
    /// Inclusive RFC 3339 upper bound
    pub end_date: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Newest first unless false
    pub sort_desc: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_type_parsing() {
        assert_eq!("HEART_RATE".parse::<HealthMetricType>(), Ok(HealthMetricType::HeartRate));
        assert_eq!("blood_oxygen".parse::<HealthMetricType>(), Ok(HealthMetricType::BloodOxygen));
        assert!("PULSE".parse::<HealthMetricType>().is_err());

        let json = serde_json::to_string(&HealthMetricType::SleepDuration).unwrap();
        assert_eq!(json, "\"SLEEP_DURATION\"");
    }

    #[test]
    fn test_ranges() {
        assert!(!HealthMetricType::Weight.accepted_range().contains(0.0));
        assert!(HealthMetricType::Steps.accepted_range().contains(0.0));
        assert!(HealthMetricType::HeartRate.normal_range().contains(100.0));
        assert!(!HealthMetricType::HeartRate.normal_range().contains(100.5));

        let total: f64 = HealthMetricType::ALL.iter().map(|t| t.weight()).sum();
        assert!((total - 1.3).abs() < 1e-9);
    }
}
