//! Descriptive statistics over measurement series.
//!
//! Standard deviations are population deviations. Functions that would
//! divide by zero return `None` or a documented neutral value instead of NaN.

use chrono::{DateTime, Utc};

use crate::entities::analysis::{Outlier, Seasonality, SeasonalityPattern, TrendType};

/// Regularity above which an interval pattern counts as seasonal
const SEASONALITY_THRESHOLD: f64 = 0.7;
/// Relative change separating a stable series from a moving one
const TREND_THRESHOLD: f64 = 0.1;
/// Outliers lie further than this many standard deviations from the mean
const OUTLIER_Z: f64 = 2.0;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Relative change between the first and last value, 0 when the first is 0
pub fn change_rate(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if values.len() >= 2 && first != 0.0 => (last - first) / first,
        _ => 0.0,
    }
}

pub fn trend_type(change_rate: f64) -> TrendType {
    if change_rate > TREND_THRESHOLD {
        TrendType::Improving
    } else if change_rate < -TREND_THRESHOLD {
        TrendType::Worsening
    } else {
        TrendType::Stable
    }
}

/// `1 - std/mean`, floored at 0
pub fn confidence(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    (1.0 - std_dev(values, m) / m).max(0.0)
}

/// Points whose z-score exceeds 2. `timestamps` runs parallel to `values`.
pub fn outliers(values: &[f64], timestamps: &[DateTime<Utc>]) -> Vec<Outlier> {
    let m = mean(values);
    let std = std_dev(values, m);
    if std == 0.0 {
        return Vec::new();
    }
    values
        .iter()
        .zip(timestamps)
        .filter_map(|(&value, &timestamp)| {
            let deviation = ((value - m) / std).abs();
            (deviation > OUTLIER_Z).then_some(Outlier {
                timestamp,
                value,
                deviation,
            })
        })
        .collect()
}

/// How closely the gaps between timestamps match `target_ms`, 1 being exact
pub fn pattern_score(intervals_ms: &[f64], target_ms: f64) -> f64 {
    if intervals_ms.is_empty() {
        return 0.0;
    }
    let deviation = intervals_ms
        .iter()
        .map(|interval| (interval - target_ms).abs() / target_ms)
        .sum::<f64>()
        / intervals_ms.len() as f64;
    1.0 - deviation
}

/// First of daily, weekly and monthly whose regularity exceeds 0.7
pub fn detect_seasonality(timestamps: &[DateTime<Utc>]) -> Option<SeasonalityPattern> {
    let intervals: Vec<f64> = timestamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64)
        .collect();

    [Seasonality::Daily, Seasonality::Weekly, Seasonality::Monthly]
        .into_iter()
        .map(|pattern| SeasonalityPattern {
            pattern,
            strength: pattern_score(&intervals, pattern.period_ms()),
        })
        .find(|candidate| candidate.strength > SEASONALITY_THRESHOLD)
}

/// Pearson coefficient of two equally long series, `None` when undefined
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let mut numerator = 0.0;
    let mut dx2 = 0.0;
    let mut dy2 = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        numerator += dx * dy;
        dx2 += dx * dx;
        dy2 += dy * dy;
    }
    let r = numerator / (dx2 * dy2).sqrt();
    r.is_finite().then_some(r)
}

/// Approximate two-tailed p-value of a Pearson coefficient over `n` pairs
pub fn significance(r: f64, n: usize) -> f64 {
    let df = n.saturating_sub(2) as f64;
    if df == 0.0 {
        return 1.0;
    }
    let r = r.clamp(-1.0, 1.0);
    let t = r * (df / (1.0 - r * r)).sqrt();
    let x = df / (df + t * t);
    let cdf = 1.0 - 0.5 * x.powf(df / 2.0);
    2.0 * (1.0 - cdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert_eq!(m, 5.0);
        assert_eq!(std_dev(&values, m), 2.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_change_rate_and_trend() {
        assert!((change_rate(&[100.0, 90.0, 120.0]) - 0.2).abs() < 1e-9);
        assert_eq!(change_rate(&[0.0, 5.0]), 0.0);
        assert_eq!(change_rate(&[5.0]), 0.0);

        assert_eq!(trend_type(0.11), TrendType::Improving);
        assert_eq!(trend_type(0.1), TrendType::Stable);
        assert_eq!(trend_type(-0.1), TrendType::Stable);
        assert_eq!(trend_type(-0.2), TrendType::Worsening);
    }

    #[test]
    fn test_confidence() {
        assert_eq!(confidence(&[70.0, 70.0, 70.0]), 1.0);
        assert_eq!(confidence(&[0.0, 0.0]), 0.0);
        assert_eq!(confidence(&[-10.0, 30.0]), 0.0);
    }

    #[test]
    fn test_outliers() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut values = vec![70.0; 10];
        values.push(160.0);
        let timestamps: Vec<_> = (0..11).map(|i| start + Duration::hours(i)).collect();

        let found = outliers(&values, &timestamps);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, 160.0);
        assert_eq!(found[0].timestamp, start + Duration::hours(10));
        // mean 1460/11, population std 900 * sqrt(10) / 11 -> |z| = sqrt(10)
        assert!((found[0].deviation - 10f64.sqrt()).abs() < 1e-9);

        assert!(outliers(&[70.0, 70.0], &timestamps[..2]).is_empty());
    }

    #[test]
    fn test_seasonality() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let daily: Vec<_> = (0..5).map(|i| start + Duration::days(i)).collect();
        let found = detect_seasonality(&daily).unwrap();
        assert_eq!(found.pattern, Seasonality::Daily);
        assert_eq!(found.strength, 1.0);

        let weekly: Vec<_> = (0..5).map(|i| start + Duration::days(7 * i)).collect();
        assert_eq!(detect_seasonality(&weekly).map(|p| p.pattern), Some(Seasonality::Weekly));

        // Gaps of 1 and 1.5 days: mean relative deviation 0.25
        let loose = vec![start, start + Duration::days(1), start + Duration::hours(60)];
        let found = detect_seasonality(&loose).unwrap();
        assert_eq!(found.pattern, Seasonality::Daily);
        assert!((found.strength - 0.75).abs() < 1e-9);

        let erratic = vec![start, start + Duration::hours(1), start + Duration::days(20)];
        assert_eq!(detect_seasonality(&erratic), None);
        assert_eq!(detect_seasonality(&[start]), None);
    }

    #[test]
    fn test_pearson() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(pearson(&xs, &[5.0, 5.0, 5.0, 5.0]), None);
        assert_eq!(pearson(&xs, &[1.0]), None);
    }

    #[test]
    fn test_significance() {
        assert_eq!(significance(1.0, 10), 0.0);
        assert!(significance(0.95, 10) < 0.05);
        assert!(significance(0.1, 5) > 0.05);
        assert_eq!(significance(0.5, 2), 1.0);
    }
}
