//! Sentiment report for one symbol

use crate::config::SentimentSettings;
use crate::correlation::{
    correlate_series, price_changes, CorrelationResult, CorrelationStrength, SentimentPoint,
};
use crate::data::{TextDocument, TimeSeries};
use crate::defaults::{DEFAULT_TREND_WINDOW, HIGH_CONFIDENCE, MODERATE_CONFIDENCE};
use crate::sentiment::{
    by_day, trend, LexiconScorer, SentimentAggregate, SentimentAggregator, SentimentTrend,
    TrendDirection,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall sentiment, its trend and its link to price moves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub overall: SentimentAggregate,
    /// Trend over daily buckets; absent with too few days
    pub trend: Option<SentimentTrend>,
    /// Correlation of per-document scores with daily price changes;
    /// absent with fewer than two aligned days
    pub correlation: Option<CorrelationResult>,
    pub summary: String,
}

impl SentimentReport {
    /// Report with the default lexicon and trend window
    pub fn generate(symbol: &str, documents: &[TextDocument], series: &TimeSeries) -> Self {
        Self::generate_with(
            &SentimentAggregator::new(),
            DEFAULT_TREND_WINDOW,
            symbol,
            documents,
            series,
        )
    }

    /// Report with the lexicon extras and trend window from `settings`
    pub fn generate_configured(
        settings: &SentimentSettings,
        symbol: &str,
        documents: &[TextDocument],
        series: &TimeSeries,
    ) -> Self {
        let aggregator = SentimentAggregator::with_scorer(LexiconScorer::from_settings(settings));
        Self::generate_with(&aggregator, settings.trend_window, symbol, documents, series)
    }

    pub fn generate_with(
        aggregator: &SentimentAggregator,
        trend_window: usize,
        symbol: &str,
        documents: &[TextDocument],
        series: &TimeSeries,
    ) -> Self {
        let scored = aggregator.score_documents(documents);
        let scores: Vec<_> = scored.iter().map(|s| s.score.clone()).collect();
        let overall = SentimentAggregate::from_scores(&scores);

        let daily: Vec<SentimentAggregate> = aggregator
            .bucket_by_time(&scored, by_day)
            .into_iter()
            .map(|bucket| bucket.aggregate)
            .collect();
        let trend = trend(&daily, trend_window).ok();

        let points: Vec<SentimentPoint> = scored.iter().map(SentimentPoint::from).collect();
        let correlation = correlate_series(&points, &price_changes(series)).ok();

        let summary = summarize(&overall, trend.as_ref(), correlation.as_ref());
        tracing::debug!("Sentiment report for {}: {}", symbol, summary);

        Self {
            symbol: symbol.to_string(),
            generated_at: Utc::now(),
            overall,
            trend,
            correlation,
            summary,
        }
    }
}

/// One-line description of a report
pub fn summarize(
    overall: &SentimentAggregate,
    trend: Option<&SentimentTrend>,
    correlation: Option<&CorrelationResult>,
) -> String {
    let confidence = if overall.confidence > HIGH_CONFIDENCE {
        "high"
    } else if overall.confidence > MODERATE_CONFIDENCE {
        "moderate"
    } else {
        "low"
    };
    let direction = trend.map_or(TrendDirection::Stable, |t| t.direction);

    let mut summary = format!(
        "Overall sentiment is {} with {} confidence. Sentiment trend is {}",
        overall.label, confidence, direction
    );
    if let Some(result) = correlation {
        if result.strength != CorrelationStrength::Negligible {
            summary.push_str(&format!(
                " with {} correlation to price movements",
                result.strength
            ));
        }
    }
    summary.push('.');
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::PredictivePower;
    use crate::sentiment::SentimentLabel;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_summary_text() {
        let mut overall = SentimentAggregate::empty();
        overall.label = SentimentLabel::Positive;
        overall.confidence = 0.5;
        let trend = SentimentTrend {
            period: 7,
            average_score: 0.3,
            label: SentimentLabel::Positive,
            direction: TrendDirection::Improving,
            volatility: 0.1,
            consistency: 0.8,
        };
        let correlation = CorrelationResult {
            coefficient: 0.8,
            sample_count: 7,
            strength: CorrelationStrength::Strong,
            predictive_power: PredictivePower::Moderate,
        };

        assert_eq!(
            summarize(&overall, Some(&trend), Some(&correlation)),
            "Overall sentiment is positive with moderate confidence. \
             Sentiment trend is improving with strong correlation to price movements."
        );
        assert_eq!(
            summarize(&SentimentAggregate::empty(), None, None),
            "Overall sentiment is neutral with low confidence. Sentiment trend is stable."
        );
    }

    #[test]
    fn test_generate() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let series = TimeSeries::from_closes(start, &[100.0, 103.0, 101.0, 106.0]).unwrap();
        let at = |day: u32| Utc.with_ymd_and_hms(2024, 6, day, 14, 0, 0).unwrap();
        let documents = vec![
            TextDocument::new(at(2), "bullish momentum, strong buy on revenue growth"),
            TextDocument::new(at(3), "analysts warn of a bear market and recession"),
            TextDocument::new(at(4), "breakthrough partnership, stock to the moon"),
        ];

        let report = SentimentReport::generate("ACME", &documents, &series);
        assert_eq!(report.symbol, "ACME");
        assert_eq!(report.overall.sample_size, 3);
        // three days are fewer than the default trend window
        assert!(report.trend.is_none());
        let correlation = report.correlation.unwrap();
        assert_eq!(correlation.sample_count, 3);
        assert!(correlation.coefficient > 0.9);
        assert!(report.summary.starts_with("Overall sentiment is positive"));
    }

    #[test]
    fn test_generate_configured() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let series = TimeSeries::from_closes(start, &[100.0, 103.0, 101.0, 106.0]).unwrap();
        let at = |day: u32| Utc.with_ymd_and_hms(2024, 6, day, 14, 0, 0).unwrap();
        let documents = vec![
            TextDocument::new(at(2), "short squeeze on the open"),
            TextDocument::new(at(3), "short squeeze continues"),
            TextDocument::new(at(4), "short squeeze everywhere"),
        ];

        let mut settings = SentimentSettings::default();
        settings.trend_window = 3;
        settings.extra_terms.insert("squeeze".to_string(), 3);

        let report = SentimentReport::generate_configured(&settings, "ACME", &documents, &series);
        assert_eq!(report.trend.as_ref().map(|t| t.period), Some(3));
        assert_eq!(report.overall.label, SentimentLabel::Positive);

        let plain = SentimentReport::generate("ACME", &documents, &series);
        assert!(plain.trend.is_none());
        assert_eq!(plain.overall.label, SentimentLabel::Neutral);
    }
}
