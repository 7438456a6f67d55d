//! # Performance Evaluation
//!
//! Error and direction metrics for forecasts, and model rankings built on
//! them.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Forecast quality against realized values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub mse: f64,
    pub mae: f64,
    pub rmse: f64,
    /// 1 - SS_res / SS_tot; 0 when the actual values are constant
    pub r2: f64,
    /// Percentage of steps whose predicted direction matched the realized one
    pub directional_accuracy: f64,
    /// max(0, (1 - MAE / mean(actual)) * 100)
    pub accuracy: f64,
}

/// Compare predictions with realized values
///
/// Both slices must be non-empty and of equal length.
pub fn evaluate(predicted: &[f64], actual: &[f64]) -> Result<PerformanceMetrics> {
    if predicted.len() != actual.len() || actual.is_empty() {
        return Err(ForecastError::DimensionMismatch {
            predicted: predicted.len(),
            actual: actual.len(),
        });
    }

    let n = actual.len() as f64;
    let mse = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum::<f64>()
        / n;
    let mae = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).abs())
        .sum::<f64>()
        / n;

    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let r2 = if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - mse * n / ss_tot
    };

    Ok(PerformanceMetrics {
        mse,
        mae,
        rmse: mse.sqrt(),
        r2,
        directional_accuracy: directional_accuracy(predicted, actual),
        accuracy: ((1.0 - mae / mean) * 100.0).max(0.0),
    })
}

/// Share (in percent) of steps where the prediction moved the same way as
/// the realized value, both measured from the previous realized value
fn directional_accuracy(predicted: &[f64], actual: &[f64]) -> f64 {
    if actual.len() < 2 {
        return 0.0;
    }

    let hits = (1..actual.len())
        .filter(|&i| {
            direction(predicted[i] - actual[i - 1]) == direction(actual[i] - actual[i - 1])
        })
        .count();

    hits as f64 / (actual.len() - 1) as f64 * 100.0
}

fn direction(change: f64) -> Ordering {
    change.partial_cmp(&0.0).unwrap_or(Ordering::Equal)
}

/// Metric used to order models
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingMetric {
    Mse,
    Mae,
    Rmse,
    R2,
    #[default]
    DirectionalAccuracy,
    Accuracy,
}

impl RankingMetric {
    pub fn value(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            RankingMetric::Mse => metrics.mse,
            RankingMetric::Mae => metrics.mae,
            RankingMetric::Rmse => metrics.rmse,
            RankingMetric::R2 => metrics.r2,
            RankingMetric::DirectionalAccuracy => metrics.directional_accuracy,
            RankingMetric::Accuracy => metrics.accuracy,
        }
    }

    /// Error metrics rank ascending, the others descending
    pub fn higher_is_better(&self) -> bool {
        matches!(
            self,
            RankingMetric::R2 | RankingMetric::DirectionalAccuracy | RankingMetric::Accuracy
        )
    }

    /// Value oriented so that larger is better; NaN ranks last
    fn merit(&self, metrics: &PerformanceMetrics) -> f64 {
        let value = self.value(metrics);
        if value.is_nan() {
            f64::NEG_INFINITY
        } else if self.higher_is_better() {
            value
        } else {
            -value
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RankingMetric::Mse => "MSE",
            RankingMetric::Mae => "MAE",
            RankingMetric::Rmse => "RMSE",
            RankingMetric::R2 => "R2",
            RankingMetric::DirectionalAccuracy => "directional accuracy",
            RankingMetric::Accuracy => "accuracy",
        })
    }
}

/// One row of a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedModel {
    /// 1-based position
    pub rank: usize,
    pub name: String,
    /// Value of the ranking metric
    pub value: f64,
    pub metrics: PerformanceMetrics,
}

/// Order models best first by `metric`; ties go to the lower RMSE, then name
pub fn rank<'a, I, K>(models: I, metric: RankingMetric) -> Vec<RankedModel>
where
    I: IntoIterator<Item = (K, &'a PerformanceMetrics)>,
    K: AsRef<str>,
{
    let mut rows: Vec<(String, PerformanceMetrics)> = models
        .into_iter()
        .map(|(name, metrics)| (name.as_ref().to_string(), *metrics))
        .collect();

    rows.sort_by(|(name_a, a), (name_b, b)| {
        metric
            .merit(b)
            .total_cmp(&metric.merit(a))
            .then_with(|| nan_last(a.rmse, b.rmse))
            .then_with(|| name_a.cmp(name_b))
    });

    rows.into_iter()
        .enumerate()
        .map(|(i, (name, metrics))| RankedModel {
            rank: i + 1,
            name,
            value: metric.value(&metrics),
            metrics,
        })
        .collect()
}

fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.total_cmp(&b),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    }
}

/// Metrics of one model under one market condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    /// External label such as "bull", "bear" or "sideways"
    pub condition: String,
    pub model: String,
    pub metrics: PerformanceMetrics,
}

/// Rank models separately for every market condition
pub fn rank_by_condition(
    results: &[ConditionResult],
    metric: RankingMetric,
) -> BTreeMap<String, Vec<RankedModel>> {
    let mut grouped: BTreeMap<String, Vec<(&str, &PerformanceMetrics)>> = BTreeMap::new();
    for result in results {
        grouped
            .entry(result.condition.clone())
            .or_default()
            .push((result.model.as_str(), &result.metrics));
    }

    grouped
        .into_iter()
        .map(|(condition, models)| (condition, rank(models, metric)))
        .collect()
}
