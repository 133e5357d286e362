use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::entities::health_record::{HealthMetricType, HealthRecord};
use crate::entities::trends::HealthTrendPoint;
use crate::errors::{AppError, ValidationError};

pub const DEFAULT_TREND_DAYS: u32 = 7;
pub const MAX_TREND_DAYS: u32 = 90;
/// Daily step goal behind the exercise score
const STEP_GOAL: f64 = 10_000.0;

/// Trait for building the daily health trend chart
pub trait TrendServiceTrait: Send + Sync {
    /// One point per day with data among the `days` days ending at `today`, oldest first.
    /// `profile_height_cm` is used for BMI when no height was recorded.
    fn daily_trends(
        &self,
        records: &[HealthRecord],
        days: u32,
        today: NaiveDate,
        profile_height_cm: Option<f64>,
    ) -> Result<Vec<HealthTrendPoint>, AppError>;
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn latest_of<'a>(records: impl Iterator<Item = &'a HealthRecord>) -> Option<&'a HealthRecord> {
    records.max_by_key(|r| r.timestamp)
}

fn bmi(day: NaiveDate, day_records: &[&HealthRecord], all: &[HealthRecord], profile_height_cm: Option<f64>) -> f64 {
    let weight = latest_of(
        day_records
            .iter()
            .copied()
            .filter(|r| r.metric_type == HealthMetricType::Weight),
    );
    let height = latest_of(
        all.iter()
            .filter(|r| r.metric_type == HealthMetricType::Height && r.timestamp.date_naive() <= day),
    )
    .map(|r| r.value)
    .or(profile_height_cm);

    match (weight, height) {
        (Some(weight), Some(height)) if height > 0.0 => {
            let metres = height / 100.0;
            round_to_tenth(weight.value / (metres * metres))
        }
        _ => 0.0,
    }
}

fn health_score(day_records: &[&HealthRecord]) -> u8 {
    let vitals: Vec<_> = day_records.iter().filter(|r| r.metric_type.is_vital_sign()).collect();
    if vitals.is_empty() {
        return 100;
    }
    let in_range = vitals.iter().filter(|r| r.is_in_normal_range()).count();
    (100.0 * in_range as f64 / vitals.len() as f64).round() as u8
}

fn exercise_score(day_records: &[&HealthRecord]) -> u8 {
    let steps: f64 = day_records
        .iter()
        .filter(|r| r.metric_type == HealthMetricType::Steps)
        .map(|r| r.value)
        .sum();
    (steps / STEP_GOAL * 100.0).round().min(100.0) as u8
}

#[derive(Debug, Clone, Default)]
pub struct TrendService;

impl TrendService {
    pub fn new() -> Self {
        Self
    }
}

impl TrendServiceTrait for TrendService {
    fn daily_trends(
        &self,
        records: &[HealthRecord],
        days: u32,
        today: NaiveDate,
        profile_height_cm: Option<f64>,
    ) -> Result<Vec<HealthTrendPoint>, AppError> {
        if days == 0 || days > MAX_TREND_DAYS {
            return Err(AppError::Validation(ValidationError::out_of_range(
                "days",
                format!("days must be between 1 and {}", MAX_TREND_DAYS),
            )));
        }

        let first_day = today - Duration::days(i64::from(days) - 1);
        let mut by_day: BTreeMap<NaiveDate, Vec<&HealthRecord>> = BTreeMap::new();
        for record in records {
            let day = record.timestamp.date_naive();
            if day >= first_day && day <= today {
                by_day.entry(day).or_default().push(record);
            }
        }

        let points: Vec<HealthTrendPoint> = by_day
            .iter()
            .map(|(day, day_records)| HealthTrendPoint {
                date: *day,
                bmi: bmi(*day, day_records, records, profile_height_cm),
                health_score: health_score(day_records),
                exercise_score: exercise_score(day_records),
            })
            .collect();

        debug!("Built {} trend points over {} days", points.len(), days);
        Ok(points)
    }
}

/// Create the default trend service
pub fn create_default_trend_service() -> impl TrendServiceTrait {
    TrendService::new()
}
