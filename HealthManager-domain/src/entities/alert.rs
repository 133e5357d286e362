use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::health_record::{HealthMetricType, HealthRecord};

#[cfg(feature = "with-api")]
use utoipa::{IntoParams, ToSchema};

/// Severity shared by alerts and risk factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(AlertLevel::Low),
            "medium" => Ok(AlertLevel::Medium),
            "high" => Ok(AlertLevel::High),
            other => Err(format!("Unknown alert level: {}", other)),
        }
    }
}

/// Comparison applied to a record value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    /// Primary value strictly above the threshold
    Above,
    /// Primary value strictly below the threshold
    Below,
    /// Secondary value (diastolic) strictly above the threshold
    SecondaryAbove,
}

/// A single threshold test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AlertCondition {
    pub op: ConditionOp,
    pub threshold: f64,
}

impl AlertCondition {
    pub fn above(threshold: f64) -> Self {
        Self { op: ConditionOp::Above, threshold }
    }

    pub fn below(threshold: f64) -> Self {
        Self { op: ConditionOp::Below, threshold }
    }

    pub fn secondary_above(threshold: f64) -> Self {
        Self { op: ConditionOp::SecondaryAbove, threshold }
    }

    /// The value that satisfied the condition, if any
    pub fn triggered_by(&self, record: &HealthRecord) -> Option<f64> {
        match self.op {
            ConditionOp::Above if record.value > self.threshold => Some(record.value),
            ConditionOp::Below if record.value < self.threshold => Some(record.value),
            ConditionOp::SecondaryAbove => record.secondary_value.filter(|v| *v > self.threshold),
            _ => None,
        }
    }
}

/// Rule turning matching records into alerts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub metric_type: HealthMetricType,
    /// The rule fires when any condition holds
    pub conditions: Vec<AlertCondition>,
    pub level: AlertLevel,
    pub message: String,
    /// Minimum time between two alerts of this rule for the same user, 0 for the 5 minute default
    pub cooldown_ms: u64,
    pub enabled: bool,
}

impl AlertRule {
    /// Cooldown in force for this rule; 0 means the default
    pub fn effective_cooldown_ms(&self) -> u64 {
        if self.cooldown_ms == 0 {
            DEFAULT_COOLDOWN_MS
        } else {
            self.cooldown_ms
        }
    }

    /// The value that triggered the rule for this record, if any
    pub fn evaluate(&self, record: &HealthRecord) -> Option<f64> {
        if !self.enabled || record.metric_type != self.metric_type {
            return None;
        }
        self.conditions.iter().find_map(|c| c.triggered_by(record))
    }
}

/// Payload for creating or replacing a rule
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AlertRuleRequest {
    /// Assigned by the server when absent
    pub id: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    pub metric_type: HealthMetricType,

    #[validate(length(min = 1, message = "At least one condition is required"))]
    pub conditions: Vec<AlertCondition>,

    pub level: AlertLevel,

    #[validate(length(min = 1, max = 500, message = "Message must be between 1 and 500 characters"))]
    pub message: String,

    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Five minutes
pub const DEFAULT_COOLDOWN_MS: u64 = 300_000;

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN_MS
}

fn default_enabled() -> bool {
    true
}

/// A triggered alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Alert {
    pub id: String,
    pub user_id: String,
    pub rule_id: String,
    pub metric_type: HealthMetricType,
    pub level: AlertLevel,
    pub message: String,
    /// Value that triggered the rule
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub handled: bool,
}

/// Filters for listing alerts
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "with-api", derive(IntoParams, ToSchema))]
pub struct AlertQuery {
    pub metric_type: Option<HealthMetricType>,
    /// Only alerts not yet handled
    #[serde(default)]
    pub active_only: bool,
}
