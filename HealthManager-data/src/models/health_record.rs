use serde::{Deserialize, Serialize};

/// Storage model for a single health measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Unique identifier for the record
    pub id: String,

    /// Owner of the record
    pub user_id: String,

    /// Metric type as stored, e.g. `HEART_RATE`
    pub metric_type: String,

    /// Primary value (systolic for blood pressure)
    pub value: f64,

    /// Secondary value (diastolic for blood pressure)
    pub secondary_value: Option<f64>,

    /// Unit of the value
    pub unit: String,

    /// When the measurement was taken (RFC 3339)
    pub timestamp: String,

    /// Optional notes about the measurement
    pub notes: Option<String>,

    /// When the record was stored (RFC 3339)
    pub created_at: String,
}

/// Input data for storing a new health record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHealthRecord {
    pub user_id: String,
    pub metric_type: String,
    pub value: f64,
    pub secondary_value: Option<f64>,
    pub unit: String,
    pub timestamp: String,
    pub notes: Option<String>,
}

/// Query parameters for listing a user's records
#[derive(Debug, Clone, Default)]
pub struct HealthRecordFilter {
    pub user_id: String,
    pub metric_type: Option<String>,
    /// Inclusive lower bound on `timestamp`
    pub start_date: Option<String>,
    /// Inclusive upper bound on `timestamp`
    pub end_date: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Newest first when unset
    pub sort_desc: Option<bool>,
}

impl HealthRecordFilter {
    /// Filter matching every record of a user
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Whether a record passes the non-pagination parts of the filter
    pub fn matches(&self, record: &HealthRecord) -> bool {
        if record.user_id != self.user_id {
            return false;
        }
        if let Some(metric_type) = &self.metric_type {
            if &record.metric_type != metric_type {
                return false;
            }
        }
        if let Some(start) = &self.start_date {
            if record.timestamp.as_str() < start.as_str() {
                return false;
            }
        }
        if let Some(end) = &self.end_date {
            if record.timestamp.as_str() > end.as_str() {
                return false;
            }
        }
        true
    }
}
