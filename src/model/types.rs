//! Model kinds, lifecycle states, predictions and training reports

use super::config::ArimaOrder;
use crate::defaults::{CONFIDENCE_BASELINE, CONFIDENCE_DECAY, CONFIDENCE_FLOOR};
use crate::error::ForecastError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forecast model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Autoregressive integrated moving average
    Arima,
    /// Two stacked LSTM layers
    Lstm,
    /// Two stacked GRU layers
    Gru,
    /// 1-D convolutions feeding an LSTM layer
    CnnLstm,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Arima,
        ModelKind::Lstm,
        ModelKind::Gru,
        ModelKind::CnnLstm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Arima => "ARIMA",
            ModelKind::Lstm => "LSTM",
            ModelKind::Gru => "GRU",
            ModelKind::CnnLstm => "CNN-LSTM",
        }
    }

    /// Conventional registry name ("arima", "lstm", "gru", "cnn-lstm")
    pub fn default_name(&self) -> &'static str {
        match self {
            ModelKind::Arima => "arima",
            ModelKind::Lstm => "lstm",
            ModelKind::Gru => "gru",
            ModelKind::CnnLstm => "cnn-lstm",
        }
    }

    pub fn is_neural(&self) -> bool {
        !matches!(self, ModelKind::Arima)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "arima" => Ok(ModelKind::Arima),
            "lstm" => Ok(ModelKind::Lstm),
            "gru" => Ok(ModelKind::Gru),
            "cnn-lstm" | "cnnlstm" => Ok(ModelKind::CnnLstm),
            _ => Err(ForecastError::InvalidParameters(format!("unknown model kind: {}", s))),
        }
    }
}

/// Why a model ended up in [`ModelState::Failed`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    Cancelled,
    Error(String),
}

/// Lifecycle: Untrained -> Training -> {Trained | Failed}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelState {
    Untrained,
    Training,
    Trained,
    Failed(FailureReason),
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Untrained => "untrained",
            ModelState::Training => "training",
            ModelState::Trained => "trained",
            ModelState::Failed(_) => "failed",
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self, ModelState::Trained)
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Failed(FailureReason::Cancelled) => f.write_str("failed (cancelled)"),
            ModelState::Failed(FailureReason::Error(cause)) => write!(f, "failed ({})", cause),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Confidence for the `day_index`-th forecast day (0-based)
///
/// Decays linearly from 0.9 by 0.05 per day and holds at 0.3.
pub fn confidence_for_day(day_index: usize) -> f64 {
    (CONFIDENCE_BASELINE - day_index as f64 * CONFIDENCE_DECAY).max(CONFIDENCE_FLOOR)
}

/// One forecast point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub date: NaiveDate,
    /// Forecast price on the original scale
    pub predicted: f64,
    /// Trust in the forecast, in (0, 1]
    pub confidence: f64,
}

/// Predictions of one `predict` call with their provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSet {
    pub model_name: String,
    pub kind: ModelKind,
    pub horizon: usize,
    pub generated_at: DateTime<Utc>,
    pub predictions: Vec<Prediction>,
}

/// ARIMA fit details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaDiagnostics {
    pub order: ArimaOrder,
    pub ar_coeffs: Vec<f64>,
    pub ma_coeffs: Vec<f64>,
    pub constant: f64,
    pub sigma2: f64,
    pub aic: f64,
    pub bic: f64,
}

/// Outcome of a successful training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub kind: ModelKind,
    /// Number of observations in the training series
    pub trained_on: usize,
    /// Epochs completed (1 for ARIMA)
    pub epochs: usize,
    /// Training loss of the last epoch (residual variance for ARIMA)
    pub loss: f64,
    /// Validation loss of the last epoch, when windows were held out
    pub val_loss: Option<f64>,
    /// Training loss per epoch
    pub loss_history: Vec<f64>,
    /// Lookback window used (neural kinds)
    pub lookback: Option<usize>,
    pub arima: Option<ArimaDiagnostics>,
}
