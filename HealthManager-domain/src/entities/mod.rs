// Domain entities and value objects
pub mod alert;
pub mod analysis;
pub mod conversions;
pub mod health_record;
pub mod trends;
pub mod user;
pub mod vitals;

// Re-export common types for easier imports
pub use alert::{Alert, AlertCondition, AlertLevel, AlertQuery, AlertRule, AlertRuleRequest, ConditionOp};
pub use analysis::{
    AdviceCategory, Correlation, DimensionAnalysis, DimensionStatus, HealthAdvice, Impact,
    Outlier, PredictionModel, RiskAssessment, RiskDetail, RiskLevel, Seasonality, SeasonalityPattern, TrendAnalysis,
    TrendType,
};
pub use health_record::{CreateHealthRecordRequest, HealthMetricType, HealthRecord, HealthRecordQuery, ValueRange};
pub use trends::{HealthTrendPoint, TrendQuery};
pub use user::{RegisterRequest, UpdateProfileRequest, User, ROLE_ADMIN, ROLE_USER};
pub use vitals::{
    BloodPressureValue, OverallHealth, VitalsAssessmentRequest, VitalsMonitor, VitalsReport, VitalsRisk, VitalsSnapshot,
};
