// Health analysis: risk, trends, correlations, per-metric scores and advice
pub mod forecast;
pub mod stats;

use tracing::debug;

use crate::entities::analysis::{
    AdviceCategory, Correlation, DimensionAnalysis, DimensionStatus, HealthAdvice, Impact, RiskAssessment, RiskDetail,
    RiskLevel, TrendAnalysis,
};
use crate::entities::health_record::{HealthMetricType, HealthRecord};
use crate::errors::{AppError, ValidationError};

/// Correlations at least this strong and significant are reported as risk factors
const STRONG_CORRELATION: f64 = 0.7;
const SIGNIFICANCE_LEVEL: f64 = 0.05;
/// Minimum points per metric before it takes part in correlation analysis
const MIN_CORRELATION_POINTS: usize = 3;
const SHORT_TERM_WINDOW: usize = 7;
const MAX_DIMENSION_SCORE: f64 = 5.0;

/// Trait for analysing one user's measurements.
/// Every operation takes the user's records in any order.
pub trait AnalysisServiceTrait: Send + Sync {
    fn assess_risk(&self, records: &[HealthRecord]) -> RiskAssessment;

    /// Needs at least two measurements of `metric_type`
    fn analyze_trend(&self, records: &[HealthRecord], metric_type: HealthMetricType) -> Result<TrendAnalysis, AppError>;

    fn analyze_correlations(&self, records: &[HealthRecord]) -> Vec<Correlation>;

    fn dimension_scores(&self, records: &[HealthRecord]) -> Vec<DimensionAnalysis>;

    /// Weighted mean of dimension scores on a 0-100 scale
    fn overall_score(&self, dimensions: &[DimensionAnalysis]) -> f64;

    /// Advice sorted by priority, most urgent first
    fn generate_advice(&self, records: &[HealthRecord]) -> Vec<HealthAdvice>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deviation {
    High,
    Low,
}

impl Deviation {
    fn score(&self) -> u32 {
        match self {
            Deviation::High => 2,
            Deviation::Low => 1,
        }
    }
}

/// Wording attached to an out-of-range reading
struct Guidance {
    factor: &'static str,
    suggestion: &'static str,
    advice: &'static str,
}

fn guidance(metric_type: HealthMetricType, deviation: Deviation) -> Guidance {
    use HealthMetricType::*;

    let (factor, suggestion, advice) = match (metric_type, deviation) {
        (BloodPressure, Deviation::High) => (
            "Blood pressure is high",
            "Reduce salt intake and exercise regularly",
            "Your blood pressure is high. Limit salt, keep a regular exercise routine and avoid late nights.",
        ),
        (BloodPressure, Deviation::Low) => (
            "Blood pressure is low",
            "Increase salt intake moderately and avoid strenuous exercise",
            "Your blood pressure is low. Increase salt moderately, avoid strenuous exercise and get enough sleep.",
        ),
        (HeartRate, Deviation::High) => (
            "Resting heart rate is high",
            "Cut down on caffeine and practise relaxation",
            "Your heart rate is high. Rest, limit caffeine and see a doctor if it stays elevated.",
        ),
        (HeartRate, Deviation::Low) => (
            "Resting heart rate is low",
            "Watch for dizziness or fatigue",
            "Your heart rate is low. If you feel dizzy or tired, consult a doctor.",
        ),
        (BloodSugar, Deviation::High) => (
            "Blood sugar is high",
            "Limit sugar and refined carbohydrates",
            "Your blood sugar is high. Limit sugar and refined carbohydrates and stay active after meals.",
        ),
        (BloodSugar, Deviation::Low) => (
            "Blood sugar is low",
            "Eat regular meals and keep a snack at hand",
            "Your blood sugar is low. Eat regular balanced meals and keep a quick snack at hand.",
        ),
        (BodyTemperature, Deviation::High) => (
            "Body temperature is elevated",
            "Rest and drink plenty of fluids",
            "You have a raised temperature. Rest, stay hydrated and monitor it closely.",
        ),
        (BodyTemperature, Deviation::Low) => (
            "Body temperature is low",
            "Keep warm",
            "Your body temperature is low. Keep warm and re-measure shortly.",
        ),
        (Weight, Deviation::High) => (
            "Body weight is high",
            "Combine a balanced diet with regular exercise",
            "Your weight is above the healthy range. A balanced diet and regular exercise help.",
        ),
        (Weight, Deviation::Low) => (
            "Body weight is low",
            "Increase calorie and protein intake",
            "Your weight is below the healthy range. Increase calorie and protein intake.",
        ),
        (Height, Deviation::High) | (Height, Deviation::Low) => (
            "Height reading is unusual",
            "Check the height measurement",
            "Your recorded height looks unusual. Please check the measurement.",
        ),
        (BloodOxygen, Deviation::High) => (
            "Blood oxygen reading is unusual",
            "Check the pulse oximeter",
            "Your blood oxygen reading looks unusual. Please re-measure.",
        ),
        (BloodOxygen, Deviation::Low) => (
            "Blood oxygen is low",
            "Breathe deeply and seek care if it persists",
            "Your blood oxygen is low. Seek medical advice if it stays below 95%.",
        ),
        (Steps, Deviation::High) => (
            "Step count is unusually high",
            "Allow time to recover",
            "You are very active. Make sure to allow time for recovery.",
        ),
        (Steps, Deviation::Low) => (
            "Daily activity is low",
            "Aim for at least 8000 steps a day",
            "Your step count is low. Aim for at least 8000 steps a day.",
        ),
        (SleepDuration, Deviation::High) => (
            "Sleep duration is long",
            "Keep a consistent sleep schedule",
            "You are sleeping more than 9 hours. Keep a consistent schedule and mention it to a doctor if you feel tired.",
        ),
        (SleepDuration, Deviation::Low) => (
            "Sleep duration is short",
            "Aim for 7 to 9 hours of sleep",
            "You are sleeping less than 7 hours. Aim for 7 to 9 hours a night.",
        ),
    };

    Guidance {
        factor,
        suggestion,
        advice,
    }
}

/// Where a reading falls relative to its normal range
fn deviation(record: &HealthRecord) -> Option<Deviation> {
    let range = record.metric_type.normal_range();
    let secondary_high = matches!(
        (record.metric_type.secondary_normal_max(), record.secondary_value),
        (Some(max), Some(value)) if value > max
    );

    if record.value > range.max || secondary_high {
        Some(Deviation::High)
    } else if record.value < range.min {
        Some(Deviation::Low)
    } else {
        None
    }
}

/// Records of one metric in time order
fn series(records: &[HealthRecord], metric_type: HealthMetricType) -> Vec<&HealthRecord> {
    let mut series: Vec<&HealthRecord> = records.iter().filter(|r| r.metric_type == metric_type).collect();
    series.sort_by_key(|r| r.timestamp);
    series
}

fn values(series: &[&HealthRecord]) -> Vec<f64> {
    series.iter().map(|r| r.value).collect()
}

fn risk_status(score: u32) -> DimensionStatus {
    match score {
        s if s >= 3 => DimensionStatus::Danger,
        s if s >= 1 => DimensionStatus::Warning,
        _ => DimensionStatus::Normal,
    }
}

fn risk_level(score: u32) -> RiskLevel {
    match score {
        s if s >= 3 => RiskLevel::High,
        s if s >= 1 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

fn describe_correlation(type1: HealthMetricType, type2: HealthMetricType, r: f64) -> String {
    let strength = match r.abs() {
        s if s > 0.7 => "strong",
        s if s > 0.3 => "moderate",
        _ => "weak",
    };
    let direction = if r > 0.0 { "positive" } else { "negative" };
    format!(
        "{} and {} show a {} {} correlation",
        capitalized(type1.label()),
        type2.label(),
        strength,
        direction
    )
}

fn capitalized(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_significant(correlation: &Correlation) -> bool {
    correlation.significance < SIGNIFICANCE_LEVEL && correlation.correlation.abs() > STRONG_CORRELATION
}

fn dimension_score(values: &[f64], mean: f64, std: f64) -> f64 {
    if std == 0.0 {
        return MAX_DIMENSION_SCORE;
    }
    let mean_z = values.iter().map(|v| ((v - mean) / std).abs()).sum::<f64>() / values.len() as f64;
    (MAX_DIMENSION_SCORE - mean_z).clamp(0.0, MAX_DIMENSION_SCORE)
}

fn dimension_status(series: &[&HealthRecord]) -> DimensionStatus {
    let abnormal = series.iter().filter(|r| !r.is_in_normal_range()).count() as f64;
    let total = series.len() as f64;
    if abnormal > total * 0.3 {
        DimensionStatus::Danger
    } else if abnormal > total * 0.1 {
        DimensionStatus::Warning
    } else {
        DimensionStatus::Normal
    }
}

fn dimension_details(metric_type: HealthMetricType, mean: f64, std: f64) -> Vec<String> {
    let range = metric_type.normal_range();
    let mut details = Vec::new();
    if mean > range.max {
        details.push(format!("Average ({:.1}) is above the normal range", mean));
    } else if mean < range.min {
        details.push(format!("Average ({:.1}) is below the normal range", mean));
    }

    if mean != 0.0 {
        let variation = std / mean;
        if variation > 0.2 {
            details.push(format!("High variability ({:.1}%)", variation * 100.0));
        }
    }
    details
}

/// Stateless analysis service
#[derive(Debug, Clone, Default)]
pub struct AnalysisService;

impl AnalysisService {
    pub fn new() -> Self {
        Self
    }
}

impl AnalysisServiceTrait for AnalysisService {
    fn assess_risk(&self, records: &[HealthRecord]) -> RiskAssessment {
        let mut factors = Vec::new();
        let mut suggestions = Vec::new();
        let mut details = Vec::new();
        let mut total = 0;

        for metric_type in HealthMetricType::ALL {
            let Some(latest) = series(records, metric_type).last().copied() else {
                continue;
            };

            let mut detail_factors = Vec::new();
            let score = match deviation(latest) {
                Some(dev) => {
                    let guidance = guidance(metric_type, dev);
                    factors.push(guidance.factor.to_string());
                    suggestions.push(guidance.suggestion.to_string());
                    detail_factors.push(guidance.factor.to_string());
                    dev.score()
                }
                None => 0,
            };

            total += score;
            details.push(RiskDetail {
                metric_type,
                score,
                status: risk_status(score),
                factors: detail_factors,
            });
        }

        factors.extend(
            self.analyze_correlations(records)
                .into_iter()
                .filter(is_significant)
                .map(|c| c.description),
        );

        let level = risk_level(total);
        debug!("Risk assessment over {} records: {:?} ({})", records.len(), level, total);
        RiskAssessment {
            level,
            score: total,
            factors,
            suggestions,
            details,
        }
    }

    fn analyze_trend(&self, records: &[HealthRecord], metric_type: HealthMetricType) -> Result<TrendAnalysis, AppError> {
        let series = series(records, metric_type);
        if series.len() < 2 {
            return Err(AppError::Validation(ValidationError::invalid_format(
                "metric_type",
                "Insufficient data for trend analysis",
            )));
        }

        let values = values(&series);
        let timestamps: Vec<_> = series.iter().map(|r| r.timestamp).collect();
        let change_rate = stats::change_rate(&values);
        let model = forecast::select_model(&values);

        Ok(TrendAnalysis {
            metric_type,
            trend_type: stats::trend_type(change_rate),
            change_rate,
            prediction: forecast::predict(&values, model, forecast::PREDICTION_HORIZON),
            confidence: stats::confidence(&values),
            model,
            seasonality: stats::detect_seasonality(&timestamps),
            outliers: stats::outliers(&values, &timestamps),
        })
    }

    fn analyze_correlations(&self, records: &[HealthRecord]) -> Vec<Correlation> {
        let candidates: Vec<(HealthMetricType, Vec<f64>)> = HealthMetricType::ALL
            .into_iter()
            .map(|t| (t, values(&series(records, t))))
            .filter(|(_, values)| values.len() >= MIN_CORRELATION_POINTS)
            .collect();

        let mut correlations = Vec::new();
        for (i, (type1, values1)) in candidates.iter().enumerate() {
            for (type2, values2) in &candidates[i + 1..] {
                let n = values1.len().min(values2.len());
                let xs = &values1[values1.len() - n..];
                let ys = &values2[values2.len() - n..];
                let Some(r) = stats::pearson(xs, ys) else {
                    continue;
                };

                correlations.push(Correlation {
                    type1: *type1,
                    type2: *type2,
                    correlation: r,
                    significance: stats::significance(r, n),
                    description: describe_correlation(*type1, *type2, r),
                });
            }
        }
        correlations
    }

    fn dimension_scores(&self, records: &[HealthRecord]) -> Vec<DimensionAnalysis> {
        HealthMetricType::ALL
            .into_iter()
            .filter_map(|metric_type| {
                let series = series(records, metric_type);
                if series.is_empty() {
                    return None;
                }
                let values = values(&series);
                let mean = stats::mean(&values);
                let std = stats::std_dev(&values, mean);
                let short_term = &values[values.len().saturating_sub(SHORT_TERM_WINDOW)..];
                let timestamps: Vec<_> = series.iter().map(|r| r.timestamp).collect();
                let seasonal = stats::detect_seasonality(&timestamps).map(|found| found.pattern);

                Some(DimensionAnalysis {
                    metric_type,
                    score: dimension_score(&values, mean, std),
                    status: dimension_status(&series),
                    details: dimension_details(metric_type, mean, std),
                    short_term_trend: stats::trend_type(stats::change_rate(short_term)),
                    long_term_trend: stats::trend_type(stats::change_rate(&values)),
                    seasonal,
                    pattern_frequency_ms: seasonal.map(|s| s.period_ms()),
                })
            })
            .collect()
    }

    fn overall_score(&self, dimensions: &[DimensionAnalysis]) -> f64 {
        let total_weight: f64 = dimensions.iter().map(|d| d.metric_type.weight()).sum();
        if total_weight == 0.0 {
            return 0.0;
        }
        let weighted: f64 = dimensions.iter().map(|d| d.score * d.metric_type.weight()).sum();
        weighted / total_weight / MAX_DIMENSION_SCORE * 100.0
    }

    fn generate_advice(&self, records: &[HealthRecord]) -> Vec<HealthAdvice> {
        let mut advice = Vec::new();

        for metric_type in HealthMetricType::ALL {
            let Some(latest) = series(records, metric_type).last().copied() else {
                continue;
            };
            let entry = match deviation(latest) {
                Some(dev) => HealthAdvice {
                    metric_type,
                    advice: guidance(metric_type, dev).advice.to_string(),
                    priority: if dev == Deviation::High { 3 } else { 2 },
                    category: AdviceCategory::ShortTerm,
                    confidence: 0.8,
                    impact: if dev == Deviation::High { Impact::High } else { Impact::Medium },
                },
                None => HealthAdvice {
                    metric_type,
                    advice: format!(
                        "Your {} is within the normal range. Keep up your current habits.",
                        metric_type.label()
                    ),
                    priority: 1,
                    category: AdviceCategory::LongTerm,
                    confidence: 0.8,
                    impact: Impact::Low,
                },
            };
            advice.push(entry);
        }

        for correlation in self.analyze_correlations(records).into_iter().filter(is_significant) {
            advice.push(HealthAdvice {
                metric_type: correlation.type1,
                advice: format!(
                    "Watch how {} and {} change together: {}",
                    correlation.type1.label(),
                    correlation.type2.label(),
                    correlation.description
                ),
                priority: 2,
                category: AdviceCategory::ShortTerm,
                confidence: 1.0 - correlation.significance,
                impact: if correlation.correlation.abs() > 0.8 {
                    Impact::High
                } else {
                    Impact::Medium
                },
            });
        }

        for dimension in self.dimension_scores(records) {
            if dimension.status != DimensionStatus::Danger {
                continue;
            }
            let reason = if dimension.details.is_empty() {
                "frequent readings outside the normal range".to_string()
            } else {
                dimension.details.join(", ")
            };
            advice.push(HealthAdvice {
                metric_type: dimension.metric_type,
                advice: format!(
                    "Check your {} soon: {}",
                    dimension.metric_type.label(),
                    reason
                ),
                priority: 3,
                category: AdviceCategory::Immediate,
                confidence: 0.9,
                impact: Impact::High,
            });
        }

        advice.sort_by(|a, b| b.priority.cmp(&a.priority));
        advice
    }
}

/// Create the default analysis service
pub fn create_default_analysis_service() -> impl AnalysisServiceTrait {
    AnalysisService::new()
}
