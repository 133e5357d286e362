use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::{IntoParams, ToSchema};

/// One day of the health trend chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct HealthTrendPoint {
    pub date: NaiveDate,
    pub bmi: f64,
    /// Share of vital signs in their normal range, 0-100
    pub health_score: u8,
    /// Steps against a 10 000 step goal, 0-100
    pub exercise_score: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "with-api", derive(IntoParams, ToSchema))]
pub struct TrendQuery {
    /// Number of days to cover (1-90, default 7)
    pub days: Option<u32>,
}
