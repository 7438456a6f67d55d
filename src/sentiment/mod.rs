//! # Sentiment Analysis
//!
//! Lexicon-based scoring of market text and aggregation of the scores.
//!
//! ## Example
//!
//! ```
//! use market_forecast::sentiment::{LexiconScorer, SentimentLabel};
//!
//! let scorer = LexiconScorer::new();
//! let result = scorer.score("Strong buy: record revenue growth and a new partnership");
//! assert_eq!(result.label, SentimentLabel::Positive);
//! ```

mod aggregator;
mod lexicon;
mod scorer;

pub use aggregator::{
    by_day, by_hour, trend, BucketAggregate, Distribution, Percentages, SentimentAggregate,
    SentimentAggregator, SentimentTrend, TimedScore, TrendDirection,
};
pub use lexicon::{tokenize, Lexicon, TermMatch};
pub use scorer::{classify, LexiconScorer, SentimentLabel, SentimentScore};
