//! # Market Forecast
//!
//! Price forecasting and market sentiment for a single symbol.
//!
//! ## Modules
//!
//! - `data` - Price bars, series and text documents
//! - `preprocessing` - Normalization and supervised windows
//! - `model` - ARIMA, LSTM, GRU and CNN-LSTM forecasters with a training lifecycle
//! - `manager` - Named models trained in the background
//! - `sentiment` - Lexicon scoring, aggregation and trends
//! - `correlation` - Sentiment against daily price changes
//! - `evaluation` - Forecast metrics and model rankings
//! - `report` - Per-symbol sentiment report
//! - `config` - TOML/JSON engine configuration
//!
//! ## Example Usage
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use market_forecast::{Hyperparameters, ModelKind, ModelManager, TimeSeries};
//!
//! #[tokio::main]
//! async fn main() {
//!     let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//!     let closes: Vec<f64> = (0..120).map(|i| 100.0 + i as f64 * 0.5).collect();
//!     let series = TimeSeries::from_closes(start, &closes).unwrap();
//!
//!     let manager = ModelManager::new();
//!     let hp = Hyperparameters::default().with_lookback(30).with_epochs(20);
//!     let report = manager.train("acme-gru", ModelKind::Gru, series, hp).await.unwrap();
//!     println!("final loss: {:.6}", report.loss);
//!
//!     for prediction in manager.predict("acme-gru", 7).unwrap() {
//!         println!("{} {:.2} ({:.2})", prediction.date, prediction.predicted, prediction.confidence);
//!     }
//! }
//! ```

pub mod config;
pub mod correlation;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod manager;
pub mod model;
pub mod preprocessing;
pub mod report;
pub mod sentiment;

// Re-exports for convenience
pub use config::{load_config, save_config, ConfigError, EngineConfig};
pub use correlation::{correlate, correlate_series, CorrelationResult, CorrelationStrength};
pub use data::{PriceBar, TextDocument, TimeSeries};
pub use error::{ForecastError, Result};
pub use evaluation::{evaluate, rank, PerformanceMetrics, RankedModel, RankingMetric};
pub use manager::{ModelManager, TrainingHandle};
pub use model::{
    ArimaOrder, CancelToken, ForecastModel, Hyperparameters, ModelKind, ModelState, Prediction,
    PredictionSet, TrainingReport,
};
pub use report::SentimentReport;
pub use sentiment::{LexiconScorer, SentimentAggregate, SentimentAggregator, SentimentLabel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Confidence of the first forecast day
    pub const CONFIDENCE_BASELINE: f64 = 0.9;

    /// Confidence lost per additional forecast day
    pub const CONFIDENCE_DECAY: f64 = 0.05;

    /// Lowest confidence assigned to any forecast day
    pub const CONFIDENCE_FLOOR: f64 = 0.3;

    /// Predicted prices are clamped to at least this value
    pub const MIN_PREDICTED_PRICE: f64 = 0.01;

    /// Observations required beyond the lookback
    pub const MIN_EXTRA_OBSERVATIONS: usize = 10;

    /// Series length required by ARIMA of any order
    pub const MIN_ARIMA_OBSERVATIONS: usize = 30;

    /// Raw lexicon score mapped to a full-scale sentiment of 1.0
    pub const SENTIMENT_NORMALIZER: f64 = 5.0;

    /// Scores above this are positive
    pub const POSITIVE_THRESHOLD: f64 = 0.1;

    /// Scores below this are negative
    pub const NEGATIVE_THRESHOLD: f64 = -0.1;

    /// Word count at which text length stops limiting confidence
    pub const CONFIDENCE_FULL_LENGTH: f64 = 10.0;

    /// Change in average score that counts as a trend
    pub const TREND_THRESHOLD: f64 = 0.1;

    /// Buckets compared by a sentiment trend
    pub const DEFAULT_TREND_WINDOW: usize = 7;

    /// Aligned samples needed for a correlation
    pub const MIN_CORRELATION_SAMPLES: usize = 2;

    /// |r| above this suggests moderate predictive power
    pub const PREDICTIVE_POWER_THRESHOLD: f64 = 0.3;

    /// Aggregate confidence reported as high
    pub const HIGH_CONFIDENCE: f64 = 0.7;

    /// Aggregate confidence reported as moderate
    pub const MODERATE_CONFIDENCE: f64 = 0.4;
}
