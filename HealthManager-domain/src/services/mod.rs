// Domain services
// This module contains business logic implementations.
pub mod alerts;
pub mod analysis;
pub mod health_data;
pub mod metrics;
pub mod trends;
pub mod user;
pub mod vitals;

use validator::ValidationErrors;

use crate::errors::{ValidationCode, ValidationError};

// Re-export service traits and factory functions
pub use alerts::{create_default_alert_service, AlertServiceTrait};
pub use analysis::{create_default_analysis_service, AnalysisServiceTrait};
pub use health_data::{create_default_health_data_service, HealthDataServiceTrait, RecordOutcome};
pub use metrics::{create_default_metrics_service, MetricsServiceTrait};
pub use trends::{create_default_trend_service, TrendServiceTrait};
pub use user::{create_default_user_service, UserServiceTrait};
pub use vitals::{create_default_vitals_service, VitalsServiceTrait};

/// Turn `validator` failures into a single domain validation error.
/// Fields are reported in name order as "field: msg, msg; field: msg".
pub(crate) fn validation_message(errors: &ValidationErrors) -> ValidationError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    let mut combined = Vec::new();
    for (field, errors) in fields {
        let messages: Vec<String> = errors
            .iter()
            .map(|err| match &err.message {
                Some(msg) => msg.to_string(),
                None => format!("Invalid {}", field),
            })
            .collect();

        let code = match errors.first().map(|e| e.code.as_ref()) {
            Some("range") => ValidationCode::ValueOutOfRange,
            Some("required") => ValidationCode::RequiredFieldMissing,
            _ => ValidationCode::InvalidFormat,
        };
        combined.push(ValidationError::new(Some(field), messages.join(", "), code));
    }

    ValidationError::combine(combined).unwrap_or_else(|| {
        ValidationError::new(None, "Invalid request", ValidationCode::InvalidFormat)
    })
}
