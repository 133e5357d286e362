use serde::{Deserialize, Serialize};

/// Storage model for a triggered risk alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub user_id: String,
    /// Rule that produced the alert
    pub rule_id: String,
    pub metric_type: String,
    /// `low`, `medium` or `high`
    pub level: String,
    pub message: String,
    /// Measured value that triggered the rule
    pub value: f64,
    pub timestamp: String,
    pub handled: bool,
}

/// Query parameters for listing a user's alerts
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub user_id: String,
    pub metric_type: Option<String>,
    /// Only alerts not yet marked handled
    pub active_only: bool,
}

impl AlertFilter {
    pub fn matches(&self, alert: &AlertRecord) -> bool {
        alert.user_id == self.user_id
            && self
                .metric_type
                .as_ref()
                .map_or(true, |t| &alert.metric_type == t)
            && !(self.active_only && alert.handled)
    }
}
