use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::health_record::HealthMetricType;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Overall risk of a user's latest measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Status of a single metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DimensionStatus {
    Normal,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RiskDetail {
    pub metric_type: HealthMetricType,
    pub score: u32,
    pub status: DimensionStatus,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: u32,
    pub factors: Vec<String>,
    pub suggestions: Vec<String>,
    pub details: Vec<RiskDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendType {
    Improving,
    Stable,
    Worsening,
}

/// Forecasting model picked for a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictionModel {
    Linear,
    Exponential,
    MovingAverage,
    Arima,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Seasonality {
    Daily,
    Weekly,
    Monthly,
}

impl Seasonality {
    /// Expected gap between measurements, in milliseconds
    pub fn period_ms(&self) -> f64 {
        const DAY_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;
        match self {
            Seasonality::Daily => DAY_MS,
            Seasonality::Weekly => 7.0 * DAY_MS,
            Seasonality::Monthly => 30.0 * DAY_MS,
        }
    }
}

/// A detected measurement rhythm and how regular it is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct SeasonalityPattern {
    pub pattern: Seasonality,
    /// Regularity of the intervals, 1 being exact
    pub strength: f64,
}

/// A value far from the series mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Outlier {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Absolute z-score
    pub deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct TrendAnalysis {
    pub metric_type: HealthMetricType,
    pub trend_type: TrendType,
    /// Relative change between the first and last value
    pub change_rate: f64,
    /// Next three predicted values
    pub prediction: Vec<f64>,
    pub confidence: f64,
    pub model: PredictionModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonality: Option<SeasonalityPattern>,
    /// Values more than two standard deviations from the mean
    pub outliers: Vec<Outlier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Correlation {
    pub type1: HealthMetricType,
    pub type2: HealthMetricType,
    /// Pearson coefficient
    pub correlation: f64,
    /// Two-tailed p-value
    pub significance: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct DimensionAnalysis {
    pub metric_type: HealthMetricType,
    /// 0 (erratic) to 5 (steady)
    pub score: f64,
    pub status: DimensionStatus,
    pub details: Vec<String>,
    /// Trend of the last seven values
    pub short_term_trend: TrendType,
    pub long_term_trend: TrendType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonal: Option<Seasonality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_frequency_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum AdviceCategory {
    Immediate,
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HealthAdvice {
    pub metric_type: HealthMetricType,
    pub advice: String,
    /// 1 (low) to 3 (urgent)
    pub priority: u8,
    pub category: AdviceCategory,
    pub confidence: f64,
    pub impact: Impact,
}
