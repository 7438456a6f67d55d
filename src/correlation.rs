//! # Correlation Engine
//!
//! Aligns sentiment with price changes by calendar day and measures how
//! strongly they move together.

use crate::data::TimeSeries;
use crate::defaults::{MIN_CORRELATION_SAMPLES, PREDICTIVE_POWER_THRESHOLD};
use crate::error::{ForecastError, Result};
use crate::sentiment::TimedScore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentiment score observed on a day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub date: NaiveDate,
    pub score: f64,
}

impl SentimentPoint {
    pub fn new(date: NaiveDate, score: f64) -> Self {
        Self { date, score }
    }
}

impl From<&TimedScore> for SentimentPoint {
    fn from(scored: &TimedScore) -> Self {
        Self::new(scored.timestamp.date_naive(), scored.score.score)
    }
}

/// Close-to-close percent change on a day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub date: NaiveDate,
    pub change_pct: f64,
}

impl PriceChange {
    pub fn new(date: NaiveDate, change_pct: f64) -> Self {
        Self { date, change_pct }
    }
}

/// Sentiment and price change on the same day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedPair {
    pub date: NaiveDate,
    pub sentiment: f64,
    pub price_change: f64,
}

/// Percent change of every bar against the previous close
///
/// The first bar has no predecessor and is skipped.
pub fn price_changes(series: &TimeSeries) -> Vec<PriceChange> {
    series
        .bars()
        .windows(2)
        .map(|pair| {
            let (prev, curr) = (&pair[0], &pair[1]);
            PriceChange::new(curr.date, (curr.close - prev.close) / prev.close * 100.0)
        })
        .collect()
}

/// Pair each sentiment point with the first price change on the same day
///
/// Points without a matching day are dropped.
pub fn align(sentiment: &[SentimentPoint], prices: &[PriceChange]) -> Vec<AlignedPair> {
    sentiment
        .iter()
        .filter_map(|point| {
            prices
                .iter()
                .find(|change| change.date == point.date)
                .map(|change| AlignedPair {
                    date: point.date,
                    sentiment: point.score,
                    price_change: change.change_pct,
                })
        })
        .collect()
}

/// Pearson correlation coefficient; 0 when either side has no variance
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let constant = |v: &[f64]| v.windows(2).all(|w| w[0] == w[1]);
    if constant(x) || constant(y) {
        return 0.0;
    }
    let nf = n as f64;

    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|b| b * b).sum();

    let numerator = nf * sum_xy - sum_x * sum_y;
    let denominator = ((nf * sum_x2 - sum_x * sum_x) * (nf * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        (numerator / denominator).clamp(-1.0, 1.0)
    }
}

/// Strength of a correlation coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Negligible,
    Weak,
    Moderate,
    Strong,
}

impl CorrelationStrength {
    /// |r| >= 0.7 strong, >= 0.3 moderate, >= 0.1 weak
    pub fn from_coefficient(r: f64) -> Self {
        let r = r.abs();
        if r >= 0.7 {
            CorrelationStrength::Strong
        } else if r >= 0.3 {
            CorrelationStrength::Moderate
        } else if r >= 0.1 {
            CorrelationStrength::Weak
        } else {
            CorrelationStrength::Negligible
        }
    }
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CorrelationStrength::Negligible => "negligible",
            CorrelationStrength::Weak => "weak",
            CorrelationStrength::Moderate => "moderate",
            CorrelationStrength::Strong => "strong",
        })
    }
}

/// Rough usefulness of sentiment as a price signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictivePower {
    Weak,
    Moderate,
}

/// Correlation between sentiment and price changes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Pearson r in [-1, 1]
    pub coefficient: f64,
    pub sample_count: usize,
    pub strength: CorrelationStrength,
    pub predictive_power: PredictivePower,
}

/// Correlate aligned pairs; at least two are required
pub fn correlate(pairs: &[AlignedPair]) -> Result<CorrelationResult> {
    if pairs.len() < MIN_CORRELATION_SAMPLES {
        return Err(ForecastError::InsufficientSamples {
            required: MIN_CORRELATION_SAMPLES,
            actual: pairs.len(),
        });
    }

    let sentiment: Vec<f64> = pairs.iter().map(|p| p.sentiment).collect();
    let changes: Vec<f64> = pairs.iter().map(|p| p.price_change).collect();
    let coefficient = pearson(&sentiment, &changes);

    Ok(CorrelationResult {
        coefficient,
        sample_count: pairs.len(),
        strength: CorrelationStrength::from_coefficient(coefficient),
        predictive_power: if coefficient.abs() > PREDICTIVE_POWER_THRESHOLD {
            PredictivePower::Moderate
        } else {
            PredictivePower::Weak
        },
    })
}

/// Align, then correlate
pub fn correlate_series(
    sentiment: &[SentimentPoint],
    prices: &[PriceChange],
) -> Result<CorrelationResult> {
    correlate(&align(sentiment, prices))
}
