use serde::{Deserialize, Serialize};

use super::alert::AlertLevel;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct BloodPressureValue {
    pub systolic: f64,
    pub diastolic: f64,
}

/// Point-in-time view of a user's wellbeing. Absent fields are not assessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct VitalsSnapshot {
    /// Beats per minute
    pub heart_rate: Option<f64>,
    pub blood_pressure: Option<BloodPressureValue>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Percent
    pub oxygen_saturation: Option<f64>,
    pub bmi: Option<f64>,
    /// Percent
    pub body_fat: Option<f64>,
    /// Daily kcal intake
    pub calories: Option<f64>,
    /// Daily grams
    pub protein: Option<f64>,
    /// Daily millilitres
    pub water_ml: Option<f64>,
    pub steps: Option<f64>,
    pub active_minutes: Option<f64>,
    /// Hours
    pub sleep_duration: Option<f64>,
    /// 0-100
    pub sleep_quality: Option<f64>,
    /// 0-10
    pub stress_level: Option<f64>,
    /// Hours needed to recover
    pub recovery_time: Option<f64>,
}

impl VitalsSnapshot {
    /// Look up a reading by field name. Blood pressure parts are addressed as
    /// `blood_pressure.systolic` and `blood_pressure.diastolic`.
    /// Returns `Err` for names that are not snapshot fields.
    pub fn value_of(&self, field: &str) -> Result<Option<f64>, String> {
        let value = match field {
            "heart_rate" => self.heart_rate,
            "blood_pressure.systolic" => self.blood_pressure.map(|bp| bp.systolic),
            "blood_pressure.diastolic" => self.blood_pressure.map(|bp| bp.diastolic),
            "temperature" => self.temperature,
            "oxygen_saturation" => self.oxygen_saturation,
            "bmi" => self.bmi,
            "body_fat" => self.body_fat,
            "calories" => self.calories,
            "protein" => self.protein,
            "water_ml" => self.water_ml,
            "steps" => self.steps,
            "active_minutes" => self.active_minutes,
            "sleep_duration" => self.sleep_duration,
            "sleep_quality" => self.sleep_quality,
            "stress_level" => self.stress_level,
            "recovery_time" => self.recovery_time,
            other => return Err(format!("Unknown vitals field: {}", other)),
        };
        Ok(value)
    }
}

/// Fires when a reading strays more than 10% from `threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct VitalsMonitor {
    /// Snapshot field, e.g. `heart_rate` or `blood_pressure.systolic`
    pub field: String,
    pub threshold: f64,
}

/// Request payload for a vitals assessment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct VitalsAssessmentRequest {
    #[serde(default)]
    pub snapshot: VitalsSnapshot,
    #[serde(default)]
    pub monitors: Vec<VitalsMonitor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct VitalsRisk {
    pub factor: String,
    pub level: AlertLevel,
    pub description: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct VitalsReport {
    pub overall_health: OverallHealth,
    pub risks: Vec<VitalsRisk>,
    /// Recommendations of every risk, deduplicated, in risk order
    pub recommendations: Vec<String>,
    /// Monitor fields whose reading strayed from the threshold
    #[serde(default)]
    pub triggered_monitors: Vec<String>,
}
