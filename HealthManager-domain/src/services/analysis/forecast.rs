//! Short-horizon forecasting for a single metric.
//!
//! Each model extrapolates `horizon` points past the end of a series indexed
//! 0..n. Model selection backtests every model on the last fifth of the
//! series and keeps the one with the lowest RMSE.

use crate::entities::analysis::PredictionModel;

use super::stats;

/// Number of points returned to callers
pub const PREDICTION_HORIZON: usize = 3;

const MODELS: [PredictionModel; 4] = [
    PredictionModel::Linear,
    PredictionModel::Exponential,
    PredictionModel::MovingAverage,
    PredictionModel::Arima,
];

/// Least-squares slope and intercept of `ys` against their index
fn regression(ys: &[f64]) -> (f64, f64) {
    let n = ys.len() as f64;
    let sum_x: f64 = (0..ys.len()).map(|i| i as f64).sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = ys.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..ys.len()).map(|i| (i * i) as f64).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    let slope = if denominator == 0.0 {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denominator
    };
    let intercept = if n == 0.0 { 0.0 } else { (sum_y - slope * sum_x) / n };
    (slope, intercept)
}

fn linear(values: &[f64], horizon: usize) -> Vec<f64> {
    let (slope, intercept) = regression(values);
    let n = values.len();
    (0..horizon).map(|i| slope * (n + i) as f64 + intercept).collect()
}

fn exponential(values: &[f64], horizon: usize) -> Vec<f64> {
    let logs: Vec<f64> = values.iter().map(|v| v.max(1e-4).ln()).collect();
    let (slope, intercept) = regression(&logs);
    let n = values.len();
    (0..horizon)
        .map(|i| (slope * (n + i) as f64 + intercept).exp())
        .collect()
}

fn moving_average(values: &[f64], horizon: usize) -> Vec<f64> {
    let window = (values.len() / 2).clamp(1, 5).min(values.len());
    let average = stats::mean(&values[values.len() - window..]);
    vec![average; horizon]
}

/// Last value plus the averaged recent drift
fn arima(values: &[f64], horizon: usize) -> Vec<f64> {
    let Some(&last) = values.last() else {
        return vec![0.0; horizon];
    };
    let diffs: Vec<f64> = values.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let drift = if diffs.is_empty() {
        0.0
    } else {
        moving_average(&diffs, 1)[0]
    };
    (1..=horizon).map(|step| last + drift * step as f64).collect()
}

/// Extrapolate `horizon` points with the given model
pub fn predict(values: &[f64], model: PredictionModel, horizon: usize) -> Vec<f64> {
    match model {
        PredictionModel::Linear => linear(values, horizon),
        PredictionModel::Exponential => exponential(values, horizon),
        PredictionModel::MovingAverage => moving_average(values, horizon),
        PredictionModel::Arima => arima(values, horizon),
    }
}

pub fn rmse(predictions: &[f64], actuals: &[f64]) -> f64 {
    let count = predictions.len().min(actuals.len());
    if count == 0 {
        return f64::INFINITY;
    }
    let squared: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| (p - a).powi(2))
        .sum();
    (squared / count as f64).sqrt()
}

/// Backtest every model on the held-out tail. Linear wins ties and short series.
pub fn select_model(values: &[f64]) -> PredictionModel {
    let test_size = values.len() / 5;
    if test_size == 0 {
        return PredictionModel::Linear;
    }
    let (train, test) = values.split_at(values.len() - test_size);

    let mut best = PredictionModel::Linear;
    let mut best_error = f64::INFINITY;
    for model in MODELS {
        let error = rmse(&predict(train, model, test.len()), test);
        if error < best_error {
            best = model;
            best_error = error;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_linear_extends_a_line() {
        assert_close(&predict(&[1.0, 2.0, 3.0, 4.0], PredictionModel::Linear, 3), &[5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_exponential_extends_growth() {
        let values = [1.0, 2.0, 4.0, 8.0];
        assert_close(&predict(&values, PredictionModel::Exponential, 2), &[16.0, 32.0]);
    }

    #[test]
    fn test_moving_average_window() {
        // window is min(5, n/2)
        let values = [10.0, 10.0, 10.0, 10.0, 20.0, 30.0];
        assert_close(&predict(&values, PredictionModel::MovingAverage, 3), &[20.0, 20.0, 20.0]);
        assert_close(&predict(&[7.0, 9.0], PredictionModel::MovingAverage, 1), &[9.0]);
    }

    #[test]
    fn test_arima_applies_drift() {
        let values = [10.0, 12.0, 14.0, 16.0, 18.0];
        assert_close(&predict(&values, PredictionModel::Arima, 3), &[20.0, 22.0, 24.0]);
        assert_close(&predict(&[5.0], PredictionModel::Arima, 2), &[5.0, 5.0]);
    }

    #[test]
    fn test_rmse() {
        assert_eq!(rmse(&[1.0, 2.0], &[1.0, 4.0]), 2.0_f64.sqrt());
        assert_eq!(rmse(&[], &[1.0]), f64::INFINITY);
    }

    #[test]
    fn test_select_model() {
        assert_eq!(select_model(&[1.0, 2.0, 3.0, 4.0]), PredictionModel::Linear);

        let flat_then_noise = [50.0, 80.0, 50.0, 80.0, 50.0, 80.0, 50.0, 80.0, 65.0, 65.0];
        assert_eq!(select_model(&flat_then_noise), PredictionModel::MovingAverage);

        let doubling: Vec<f64> = (0..10).map(|i| 2f64.powi(i)).collect();
        assert_eq!(select_model(&doubling), PredictionModel::Exponential);
    }
}
