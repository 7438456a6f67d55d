//! Engine configuration
//!
//! Settings load from and save to TOML or JSON, chosen by file extension.
//! Missing fields fall back to their defaults.

use crate::defaults::DEFAULT_TREND_WINDOW;
use crate::model::{ArimaOrder, Hyperparameters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model training settings
    pub training: TrainingSettings,
    /// Sentiment scoring settings
    pub sentiment: SentimentSettings,
}

/// Default hyperparameters for model training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    /// Lookback window length
    pub lookback: usize,
    pub epochs: usize,
    pub batch_size: usize,
    /// Share of windows held out for validation
    pub validation_split: f64,
    pub learning_rate: f64,
    pub dropout: f64,
    /// Units per recurrent layer
    pub recurrent_units: usize,
    pub conv_filters: usize,
    pub kernel_size: usize,
    pub pool_size: usize,
    /// ARIMA order as [p, d, q]
    pub arima_order: [usize; 3],
    /// Seed for weight initialisation
    pub seed: u64,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        let hp = Hyperparameters::default();
        Self {
            lookback: hp.lookback,
            epochs: hp.epochs,
            batch_size: hp.batch_size,
            validation_split: hp.validation_split,
            learning_rate: hp.learning_rate,
            dropout: hp.dropout,
            recurrent_units: hp.recurrent_units,
            conv_filters: hp.conv_filters,
            kernel_size: hp.kernel_size,
            pool_size: hp.pool_size,
            arima_order: [hp.arima_order.p, hp.arima_order.d, hp.arima_order.q],
            seed: hp.seed,
        }
    }
}

impl From<&TrainingSettings> for Hyperparameters {
    fn from(settings: &TrainingSettings) -> Self {
        let [p, d, q] = settings.arima_order;
        Self {
            lookback: settings.lookback,
            epochs: settings.epochs,
            batch_size: settings.batch_size,
            validation_split: settings.validation_split,
            learning_rate: settings.learning_rate,
            dropout: settings.dropout,
            recurrent_units: settings.recurrent_units,
            conv_filters: settings.conv_filters,
            kernel_size: settings.kernel_size,
            pool_size: settings.pool_size,
            arima_order: ArimaOrder::new(p, d, q),
            seed: settings.seed,
        }
    }
}

/// Sentiment scoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentSettings {
    /// Extra lexicon entries, applied after the built-in market terms
    pub extra_terms: BTreeMap<String, i32>,
    /// Number of buckets in a trend window
    pub trend_window: usize,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            extra_terms: BTreeMap::new(),
            trend_window: DEFAULT_TREND_WINDOW,
        }
    }
}

/// Load configuration from file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ConfigError::FileError(e.to_string()))?;

    match extension(path.as_ref()) {
        "json" => serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string())),
        "toml" => toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string())),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Save configuration to file
pub fn save_config<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<(), ConfigError> {
    let content = match extension(path.as_ref()) {
        "json" => serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?,
        "toml" => toml::to_string_pretty(config)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?,
        other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
    };

    std::fs::write(path, content).map_err(|e| ConfigError::FileError(e.to_string()))
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("File error: {0}")]
    FileError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_hyperparameters() {
        let config = EngineConfig::default();
        assert_eq!(Hyperparameters::from(&config.training), Hyperparameters::default());
        assert_eq!(config.sentiment.trend_window, 7);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let mut config = EngineConfig::default();
        config.training.lookback = 30;
        config.training.arima_order = [2, 1, 0];
        config.sentiment.extra_terms.insert("squeeze".into(), 3);

        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "training": { "epochs": 5 } }"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.training.lookback, 60);
    }

    #[test]
    fn test_unsupported_format() {
        let err = save_config(&EngineConfig::default(), "engine.ini").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "ini"));
    }
}
