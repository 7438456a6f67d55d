//! # Sentiment Aggregator
//!
//! Folds many per-text scores into one snapshot, groups timestamped scores
//! into time buckets and measures the trend across consecutive snapshots.

use super::scorer::{classify, LexiconScorer, SentimentLabel, SentimentScore};
use crate::data::TextDocument;
use crate::defaults::TREND_THRESHOLD;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, DurationRound, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl Distribution {
    pub fn from_labels<I: IntoIterator<Item = SentimentLabel>>(labels: I) -> Self {
        let mut distribution = Self::default();
        for label in labels {
            match label {
                SentimentLabel::Positive => distribution.positive += 1,
                SentimentLabel::Negative => distribution.negative += 1,
                SentimentLabel::Neutral => distribution.neutral += 1,
            }
        }
        distribution
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    pub fn count(&self, label: SentimentLabel) -> usize {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
        }
    }

    /// Most frequent label; ties resolve to neutral
    pub fn modal_label(&self) -> SentimentLabel {
        let top = self.positive.max(self.negative).max(self.neutral);
        if self.positive == top && self.negative < top && self.neutral < top {
            SentimentLabel::Positive
        } else if self.negative == top && self.positive < top && self.neutral < top {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn percentages(&self) -> Percentages {
        let total = self.total();
        if total == 0 {
            return Percentages::default();
        }
        let pct = |count: usize| count as f64 / total as f64 * 100.0;
        Percentages {
            positive: pct(self.positive),
            negative: pct(self.negative),
            neutral: pct(self.neutral),
        }
    }
}

/// Label shares in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentages {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// Snapshot over a batch of scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAggregate {
    /// Mean normalized score
    pub score: f64,
    /// Label of the mean score
    pub label: SentimentLabel,
    /// Most frequent per-text label
    pub majority_label: SentimentLabel,
    /// Mean per-text confidence
    pub confidence: f64,
    pub distribution: Distribution,
    pub percentages: Percentages,
    pub sample_size: usize,
}

impl SentimentAggregate {
    /// Neutral snapshot of nothing
    pub fn empty() -> Self {
        Self::from_scores(&[])
    }

    pub fn from_scores(scores: &[SentimentScore]) -> Self {
        let n = scores.len();
        if n == 0 {
            return Self {
                score: 0.0,
                label: SentimentLabel::Neutral,
                majority_label: SentimentLabel::Neutral,
                confidence: 0.0,
                distribution: Distribution::default(),
                percentages: Percentages::default(),
                sample_size: 0,
            };
        }

        let score = scores.iter().map(|s| s.score).sum::<f64>() / n as f64;
        let confidence = scores.iter().map(|s| s.confidence).sum::<f64>() / n as f64;
        let distribution = Distribution::from_labels(scores.iter().map(|s| s.label));

        Self {
            score,
            label: classify(score),
            majority_label: distribution.modal_label(),
            confidence,
            distribution,
            percentages: distribution.percentages(),
            sample_size: n,
        }
    }
}

/// Score of a timestamped text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedScore {
    pub timestamp: DateTime<Utc>,
    pub score: SentimentScore,
}

/// Aggregate of the scores falling into one time bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketAggregate {
    /// Start of the bucket
    pub bucket: DateTime<Utc>,
    pub aggregate: SentimentAggregate,
}

/// Truncate to the start of the hour
pub fn by_hour(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .duration_trunc(Duration::hours(1))
        .unwrap_or(timestamp)
}

/// Truncate to midnight UTC
pub fn by_day(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .duration_trunc(Duration::days(1))
        .unwrap_or(timestamp)
}

/// Direction of sentiment over a trend window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
        })
    }
}

/// Trend over the last `period` aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentTrend {
    pub period: usize,
    pub average_score: f64,
    pub label: SentimentLabel,
    pub direction: TrendDirection,
    /// Population standard deviation of the scores
    pub volatility: f64,
    /// Share of the most common label
    pub consistency: f64,
}

/// Trend of the last `window_size` aggregates
///
/// Compares the mean score of the second half of the window with the first
/// half (the first half holds floor(window / 2) entries).
pub fn trend(aggregates: &[SentimentAggregate], window_size: usize) -> Result<SentimentTrend> {
    if window_size == 0 {
        return Err(ForecastError::InvalidParameters(
            "trend window must hold at least one aggregate".into(),
        ));
    }
    if aggregates.len() < window_size {
        return Err(ForecastError::InsufficientSamples {
            required: window_size,
            actual: aggregates.len(),
        });
    }

    let window = &aggregates[aggregates.len() - window_size..];
    let scores: Vec<f64> = window.iter().map(|a| a.score).collect();
    let average_score = mean(&scores);

    let direction = if scores.len() < 2 {
        TrendDirection::Stable
    } else {
        let (first, second) = scores.split_at(scores.len() / 2);
        let difference = mean(second) - mean(first);
        if difference > TREND_THRESHOLD {
            TrendDirection::Improving
        } else if difference < -TREND_THRESHOLD {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    };

    let volatility = if scores.len() < 2 {
        0.0
    } else {
        (scores.iter().map(|s| (s - average_score).powi(2)).sum::<f64>() / scores.len() as f64)
            .sqrt()
    };

    let labels = Distribution::from_labels(window.iter().map(|a| a.label));
    let top = labels.positive.max(labels.negative).max(labels.neutral);

    Ok(SentimentTrend {
        period: window_size,
        average_score,
        label: classify(average_score),
        direction,
        volatility,
        consistency: top as f64 / window_size as f64,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Batch scoring on top of a [`LexiconScorer`]
#[derive(Debug, Clone, Default)]
pub struct SentimentAggregator {
    scorer: LexiconScorer,
}

impl SentimentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scorer(scorer: LexiconScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &LexiconScorer {
        &self.scorer
    }

    /// Score every text in parallel and fold the results
    pub fn aggregate<S>(&self, texts: &[S]) -> SentimentAggregate
    where
        S: AsRef<str> + Sync,
    {
        let scores: Vec<SentimentScore> = texts
            .par_iter()
            .map(|text| self.scorer.score(text.as_ref()))
            .collect();
        SentimentAggregate::from_scores(&scores)
    }

    /// Score timestamped documents, keeping input order
    pub fn score_documents(&self, documents: &[TextDocument]) -> Vec<TimedScore> {
        documents
            .par_iter()
            .map(|doc| TimedScore {
                timestamp: doc.timestamp,
                score: self.scorer.score(&doc.text),
            })
            .collect()
    }

    /// Group scores by `bucket_fn(timestamp)` and aggregate each bucket
    ///
    /// Buckets come back in chronological order.
    pub fn bucket_by_time<F>(&self, scored: &[TimedScore], bucket_fn: F) -> Vec<BucketAggregate>
    where
        F: Fn(DateTime<Utc>) -> DateTime<Utc>,
    {
        let mut buckets: BTreeMap<DateTime<Utc>, Vec<SentimentScore>> = BTreeMap::new();
        for item in scored {
            buckets
                .entry(bucket_fn(item.timestamp))
                .or_default()
                .push(item.score.clone());
        }

        buckets
            .into_iter()
            .map(|(bucket, scores)| BucketAggregate {
                bucket,
                aggregate: SentimentAggregate::from_scores(&scores),
            })
            .collect()
    }

    /// See [`trend`]
    pub fn trend(
        &self,
        aggregates: &[SentimentAggregate],
        window_size: usize,
    ) -> Result<SentimentTrend> {
        trend(aggregates, window_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn aggregate_with(score: f64) -> SentimentAggregate {
        SentimentAggregate {
            score,
            label: classify(score),
            majority_label: classify(score),
            confidence: 0.5,
            distribution: Distribution::default(),
            percentages: Percentages::default(),
            sample_size: 1,
        }
    }

    #[test]
    fn test_batch_distribution() {
        let aggregator = SentimentAggregator::new();
        let result = aggregator.aggregate(&[
            "bullish breakout, strong buy",
            "bear market crash incoming",
            "steady trading today",
        ]);

        assert_eq!(
            result.distribution,
            Distribution {
                positive: 1,
                negative: 1,
                neutral: 1
            }
        );
        assert_eq!(result.sample_size, 3);
        assert_eq!(result.majority_label, SentimentLabel::Neutral);
        assert!((result.percentages.positive - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_batch() {
        let result = SentimentAggregator::new().aggregate::<&str>(&[]);
        assert_eq!(result, SentimentAggregate::empty());
        assert_eq!(result.label, SentimentLabel::Neutral);
    }

    #[test]
    fn test_modal_label() {
        let d = Distribution {
            positive: 3,
            negative: 1,
            neutral: 2,
        };
        assert_eq!(d.modal_label(), SentimentLabel::Positive);
        let tie = Distribution {
            positive: 2,
            negative: 2,
            neutral: 0,
        };
        assert_eq!(tie.modal_label(), SentimentLabel::Neutral);
    }

    #[test]
    fn test_bucket_by_hour() {
        let aggregator = SentimentAggregator::new();
        let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap();
        let docs = vec![
            TextDocument::new(at(10, 5), "bullish"),
            TextDocument::new(at(9, 59), "crash"),
            TextDocument::new(at(10, 45), "great growth"),
        ];

        let buckets = aggregator.bucket_by_time(&aggregator.score_documents(&docs), by_hour);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].bucket, at(9, 0));
        assert_eq!(buckets[1].aggregate.sample_size, 2);
        assert_eq!(by_day(at(23, 10)), at(0, 0));
    }

    #[test]
    fn test_trend_improving() {
        let series: Vec<_> = [-0.4, -0.3, -0.2, 0.2, 0.3, 0.4]
            .iter()
            .map(|&s| aggregate_with(s))
            .collect();
        let result = trend(&series, 6).unwrap();

        assert_eq!(result.direction, TrendDirection::Improving);
        assert!(result.average_score.abs() < 1e-12);
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert!((result.consistency - 0.5).abs() < 1e-12);
        assert!(result.volatility > 0.0);
    }

    #[test]
    fn test_trend_uses_last_window() {
        let series: Vec<_> = [0.9, 0.9, 0.0, 0.0, 0.0, 0.0]
            .iter()
            .map(|&s| aggregate_with(s))
            .collect();
        let result = trend(&series, 4).unwrap();
        assert_eq!(result.direction, TrendDirection::Stable);
        assert_eq!(result.volatility, 0.0);
        assert_eq!(result.consistency, 1.0);
    }

    #[test]
    fn test_trend_errors() {
        let series = vec![aggregate_with(0.2); 3];
        assert_eq!(
            trend(&series, 7).unwrap_err(),
            ForecastError::InsufficientSamples {
                required: 7,
                actual: 3
            }
        );
        assert!(matches!(
            trend(&series, 0),
            Err(ForecastError::InvalidParameters(_))
        ));
    }
}
