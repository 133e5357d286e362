use tracing::debug;

use crate::entities::alert::AlertLevel;
use crate::entities::vitals::{OverallHealth, VitalsMonitor, VitalsReport, VitalsRisk, VitalsSnapshot};
use crate::errors::{AppError, ValidationError};

/// Daily calorie intake used as the nutrition reference
const RECOMMENDED_CALORIES: f64 = 2000.0;
/// Monitors fire when a reading strays further than this fraction of the threshold
const MONITOR_TOLERANCE: f64 = 0.1;

/// Trait for assessing a snapshot of vital signs and lifestyle measurements
pub trait VitalsServiceTrait: Send + Sync {
    fn assess(&self, snapshot: &VitalsSnapshot) -> VitalsReport;

    /// Fields of `monitors` whose reading strays from the monitor threshold.
    /// Unknown fields are a validation error.
    fn triggered_monitors(&self, snapshot: &VitalsSnapshot, monitors: &[VitalsMonitor]) -> Result<Vec<String>, AppError>;
}

/// Whether `value` differs from `threshold` by more than 10% of the threshold
pub fn monitor_triggered(value: f64, threshold: f64) -> bool {
    (value - threshold).abs() > threshold.abs() * MONITOR_TOLERANCE
}

fn risk(factor: &str, level: AlertLevel, description: &str, recommendations: &[&str]) -> VitalsRisk {
    VitalsRisk {
        factor: factor.to_string(),
        level,
        description: description.to_string(),
        recommendations: recommendations.iter().map(|r| r.to_string()).collect(),
    }
}

fn level(high: bool) -> AlertLevel {
    if high {
        AlertLevel::High
    } else {
        AlertLevel::Medium
    }
}

fn vital_sign_risks(snapshot: &VitalsSnapshot, risks: &mut Vec<VitalsRisk>) {
    if let Some(hr) = snapshot.heart_rate {
        if !(60.0..=100.0).contains(&hr) {
            risks.push(risk(
                "heart_rate",
                level(!(50.0..=120.0).contains(&hr)),
                "Abnormal heart rate",
                &["Exercise regularly", "Avoid strenuous exercise", "Get enough rest", "See a doctor if needed"],
            ));
        }
    }

    if let Some(bp) = snapshot.blood_pressure {
        if bp.systolic > 140.0 || bp.diastolic > 90.0 {
            risks.push(risk(
                "blood_pressure",
                AlertLevel::High,
                "High blood pressure",
                &[
                    "Limit salt intake",
                    "Exercise regularly",
                    "Eat a healthy diet",
                    "Monitor your blood pressure regularly",
                ],
            ));
        }
    }

    if let Some(temperature) = snapshot.temperature {
        if temperature > 37.5 {
            risks.push(risk(
                "temperature",
                level(temperature > 38.5),
                "Elevated body temperature",
                &["Get plenty of rest", "Stay hydrated", "See a doctor if needed"],
            ));
        }
    }

    if let Some(spo2) = snapshot.oxygen_saturation {
        if spo2 < 95.0 {
            risks.push(risk(
                "oxygen_saturation",
                level(spo2 < 90.0),
                "Low oxygen saturation",
                &["Keep your airways clear", "Avoid strenuous exercise", "See a doctor if needed"],
            ));
        }
    }
}

fn body_risks(snapshot: &VitalsSnapshot, risks: &mut Vec<VitalsRisk>) {
    if let Some(bmi) = snapshot.bmi {
        if !(18.5..=25.0).contains(&bmi) {
            risks.push(risk(
                "bmi",
                level(!(16.0..=30.0).contains(&bmi)),
                if bmi < 18.5 { "Low BMI" } else { "High BMI" },
                &["Adjust your diet", "Exercise regularly", "Consult a nutritionist"],
            ));
        }
    }

    if let Some(body_fat) = snapshot.body_fat {
        if body_fat > 25.0 {
            risks.push(risk(
                "body_fat",
                level(body_fat > 30.0),
                "High body fat",
                &["Add aerobic exercise", "Control calorie intake", "Increase protein intake"],
            ));
        }
    }
}

fn nutrition_risks(snapshot: &VitalsSnapshot, risks: &mut Vec<VitalsRisk>) {
    if let Some(calories) = snapshot.calories {
        if (calories - RECOMMENDED_CALORIES).abs() > 500.0 {
            risks.push(risk(
                "calories",
                AlertLevel::Medium,
                if calories < RECOMMENDED_CALORIES {
                    "Calorie intake too low"
                } else {
                    "Calorie intake too high"
                },
                &["Eat a balanced diet", "Control portion sizes", "Choose healthy foods"],
            ));
        }
    }

    if let Some(protein) = snapshot.protein {
        if protein < 50.0 {
            risks.push(risk(
                "protein",
                AlertLevel::Medium,
                "Insufficient protein intake",
                &[
                    "Eat more high-quality protein",
                    "Include lean meat, fish and eggs",
                    "Consider a protein supplement",
                ],
            ));
        }
    }

    if let Some(water) = snapshot.water_ml {
        if water < 2000.0 {
            risks.push(risk(
                "water",
                AlertLevel::Medium,
                "Insufficient water intake",
                &["Drink more water", "Drink at regular intervals", "Watch the colour of your urine"],
            ));
        }
    }
}

fn activity_risks(snapshot: &VitalsSnapshot, risks: &mut Vec<VitalsRisk>) {
    if let Some(steps) = snapshot.steps {
        if steps < 8000.0 {
            risks.push(risk(
                "steps",
                level(steps < 5000.0),
                "Low daily activity",
                &[
                    "Walk more",
                    "Take the stairs instead of the lift",
                    "Get up and move regularly while working",
                ],
            ));
        }
    }

    if let Some(minutes) = snapshot.active_minutes {
        if minutes < 30.0 {
            risks.push(risk(
                "active_minutes",
                AlertLevel::Medium,
                "Not enough exercise time",
                &[
                    "Do 30 minutes of moderate exercise daily",
                    "Join an exercise class",
                    "Find a sport you enjoy",
                ],
            ));
        }
    }
}

fn sleep_and_stress_risks(snapshot: &VitalsSnapshot, risks: &mut Vec<VitalsRisk>) {
    if let Some(hours) = snapshot.sleep_duration {
        if !(7.0..=9.0).contains(&hours) {
            risks.push(risk(
                "sleep_duration",
                level(!(6.0..=10.0).contains(&hours)),
                if hours < 7.0 { "Not enough sleep" } else { "Too much sleep" },
                &[
                    "Keep a regular sleep schedule",
                    "Create a good sleep environment",
                    "Avoid screens before bed",
                ],
            ));
        }
    }

    if let Some(quality) = snapshot.sleep_quality {
        if quality < 80.0 {
            risks.push(risk(
                "sleep_quality",
                level(quality < 60.0),
                "Poor sleep quality",
                &["Keep a regular sleep schedule", "Relax before bed", "Avoid caffeine"],
            ));
        }
    }

    if let Some(stress) = snapshot.stress_level {
        if stress > 7.0 {
            risks.push(risk(
                "stress",
                level(stress > 8.0),
                "High stress level",
                &["Practise relaxation techniques", "Exercise regularly", "Seek counselling"],
            ));
        }
    }

    if let Some(recovery) = snapshot.recovery_time {
        if recovery > 48.0 {
            risks.push(risk(
                "recovery",
                AlertLevel::High,
                "Reduced recovery capacity",
                &["Rest more", "Improve sleep quality", "Exercise moderately"],
            ));
        }
    }
}

/// More than two high risks is poor, any high or more than three medium is fair
pub fn overall_health(risks: &[VitalsRisk]) -> OverallHealth {
    let high = risks.iter().filter(|r| r.level == AlertLevel::High).count();
    let medium = risks.iter().filter(|r| r.level == AlertLevel::Medium).count();

    if high > 2 {
        OverallHealth::Poor
    } else if high > 0 || medium > 3 {
        OverallHealth::Fair
    } else if medium > 0 {
        OverallHealth::Good
    } else {
        OverallHealth::Excellent
    }
}

/// Rule-based vitals assessment
#[derive(Debug, Clone, Default)]
pub struct VitalsService;

impl VitalsService {
    pub fn new() -> Self {
        Self
    }
}

impl VitalsServiceTrait for VitalsService {
    fn assess(&self, snapshot: &VitalsSnapshot) -> VitalsReport {
        let mut risks = Vec::new();
        vital_sign_risks(snapshot, &mut risks);
        body_risks(snapshot, &mut risks);
        nutrition_risks(snapshot, &mut risks);
        activity_risks(snapshot, &mut risks);
        sleep_and_stress_risks(snapshot, &mut risks);

        let mut recommendations: Vec<String> = Vec::new();
        for recommendation in risks.iter().flat_map(|r| r.recommendations.iter()) {
            if !recommendations.contains(recommendation) {
                recommendations.push(recommendation.clone());
            }
        }

        let overall_health = overall_health(&risks);
        debug!("Vitals assessment: {} risks, {:?}", risks.len(), overall_health);
        VitalsReport {
            overall_health,
            risks,
            recommendations,
            triggered_monitors: Vec::new(),
        }
    }

    fn triggered_monitors(&self, snapshot: &VitalsSnapshot, monitors: &[VitalsMonitor]) -> Result<Vec<String>, AppError> {
        let mut triggered = Vec::new();
        for monitor in monitors {
            let value = snapshot
                .value_of(&monitor.field)
                .map_err(|e| AppError::Validation(ValidationError::invalid_format("monitors", e)))?;
            if let Some(value) = value {
                if monitor_triggered(value, monitor.threshold) {
                    triggered.push(monitor.field.clone());
                }
            }
        }
        Ok(triggered)
    }
}

/// Create the default vitals service
pub fn create_default_vitals_service() -> impl VitalsServiceTrait {
    VitalsService::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::vitals::BloodPressureValue;

    fn factors(report: &VitalsReport) -> Vec<(&str, AlertLevel)> {
        report.risks.iter().map(|r| (r.factor.as_str(), r.level)).collect()
    }

    #[test]
    fn test_empty_snapshot_is_excellent() {
        let report = VitalsService::new().assess(&VitalsSnapshot::default());
        assert!(report.risks.is_empty());
        assert!(report.recommendations.is_empty());
        assert_eq!(report.overall_health, OverallHealth::Excellent);
    }

    #[test]
    fn test_heart_rate_levels() {
        let service = VitalsService::new();
        let at = |hr| {
            service.assess(&VitalsSnapshot {
                heart_rate: Some(hr),
                ..VitalsSnapshot::default()
            })
        };
        assert!(at(60.0).risks.is_empty());
        assert!(at(100.0).risks.is_empty());
        assert_eq!(factors(&at(55.0)), vec![("heart_rate", AlertLevel::Medium)]);
        assert_eq!(factors(&at(110.0)), vec![("heart_rate", AlertLevel::Medium)]);
        assert_eq!(factors(&at(45.0)), vec![("heart_rate", AlertLevel::High)]);
        assert_eq!(factors(&at(125.0)), vec![("heart_rate", AlertLevel::High)]);
        assert_eq!(at(110.0).overall_health, OverallHealth::Good);
    }

    #[test]
    fn test_threshold_rules() {
        let service = VitalsService::new();
        let snapshot = VitalsSnapshot {
            blood_pressure: Some(BloodPressureValue {
                systolic: 130.0,
                diastolic: 95.0,
            }),
            temperature: Some(38.0),
            oxygen_saturation: Some(89.0),
            bmi: Some(17.0),
            body_fat: Some(31.0),
            calories: Some(2600.0),
            protein: Some(40.0),
            water_ml: Some(1500.0),
            steps: Some(6000.0),
            active_minutes: Some(20.0),
            sleep_duration: Some(5.5),
            sleep_quality: Some(70.0),
            stress_level: Some(8.5),
            recovery_time: Some(50.0),
            ..VitalsSnapshot::default()
        };

        let report = service.assess(&snapshot);
        assert_eq!(
            factors(&report),
            vec![
                ("blood_pressure", AlertLevel::High),
                ("temperature", AlertLevel::Medium),
                ("oxygen_saturation", AlertLevel::High),
                ("bmi", AlertLevel::Medium),
                ("body_fat", AlertLevel::High),
                ("calories", AlertLevel::Medium),
                ("protein", AlertLevel::Medium),
                ("water", AlertLevel::Medium),
                ("steps", AlertLevel::Medium),
                ("active_minutes", AlertLevel::Medium),
                ("sleep_duration", AlertLevel::High),
                ("sleep_quality", AlertLevel::Medium),
                ("stress", AlertLevel::High),
                ("recovery", AlertLevel::High),
            ]
        );
        assert_eq!(report.risks[3].description, "Low BMI");
        assert_eq!(report.risks[5].description, "Calorie intake too high");
        assert_eq!(report.risks[10].description, "Not enough sleep");
        assert_eq!(report.overall_health, OverallHealth::Poor);

        let exercise = report
            .recommendations
            .iter()
            .filter(|r| r.as_str() == "Exercise regularly")
            .count();
        assert_eq!(exercise, 1);
    }

    #[test]
    fn test_overall_health_thresholds() {
        let medium = |n| vec![risk("x", AlertLevel::Medium, "", &[]); n];
        let high = |n| vec![risk("x", AlertLevel::High, "", &[]); n];

        assert_eq!(overall_health(&medium(3)), OverallHealth::Good);
        assert_eq!(overall_health(&medium(4)), OverallHealth::Fair);
        assert_eq!(overall_health(&high(2)), OverallHealth::Fair);
        assert_eq!(overall_health(&high(3)), OverallHealth::Poor);
    }

    #[test]
    fn test_monitors() {
        assert!(!monitor_triggered(105.0, 100.0));
        assert!(!monitor_triggered(110.0, 100.0));
        assert!(monitor_triggered(111.0, 100.0));
        assert!(monitor_triggered(89.0, 100.0));

        let service = VitalsService::new();
        let snapshot = VitalsSnapshot {
            heart_rate: Some(130.0),
            steps: Some(9000.0),
            ..VitalsSnapshot::default()
        };
        let monitors = vec![
            VitalsMonitor {
                field: "heart_rate".to_string(),
                threshold: 100.0,
            },
            VitalsMonitor {
                field: "steps".to_string(),
                threshold: 9500.0,
            },
            VitalsMonitor {
                field: "temperature".to_string(),
                threshold: 37.0,
            },
        ];
        assert_eq!(service.triggered_monitors(&snapshot, &monitors).unwrap(), vec!["heart_rate".to_string()]);

        let unknown = vec![VitalsMonitor {
            field: "mood".to_string(),
            threshold: 1.0,
        }];
        assert!(matches!(
            service.triggered_monitors(&snapshot, &unknown),
            Err(AppError::Validation(_))
        ));
    }
}
