//! Error types for the forecasting and sentiment engine

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Main error type for the library
///
/// Every variant is recoverable by the caller: supply more data, wait for a
/// running training job, or pick another model name.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Malformed or degenerate input series
    #[error("Invalid data: {0}")]
    Data(String),

    /// Series shorter than the model needs
    #[error("Insufficient data: {actual} observations, at least {required} required")]
    InsufficientData { required: usize, actual: usize },

    /// Too few aligned samples for a statistic
    #[error("Insufficient samples: {actual} samples, at least {required} required")]
    InsufficientSamples { required: usize, actual: usize },

    /// Model exists but has no usable trained parameters
    #[error("Model '{name}' is not ready (state: {state})")]
    ModelNotReady { name: String, state: String },

    /// Model is currently training
    #[error("Model '{0}' is busy training")]
    ModelBusy(String),

    /// No model was ever trained under this name
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Evaluator inputs differ in length or are empty
    #[error("Dimension mismatch: {predicted} predictions vs {actual} actual values")]
    DimensionMismatch { predicted: usize, actual: usize },

    /// Underlying numerical fit failed
    #[error("Training failed: {0}")]
    Training(String),

    /// Training was cancelled before completion
    #[error("Training was cancelled")]
    Cancelled,

    /// Hyperparameters cannot produce a valid model
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

impl ForecastError {
    /// Check if retrying later (or with more data) can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ForecastError::ModelBusy(_)
                | ForecastError::Cancelled
                | ForecastError::InsufficientData { .. }
                | ForecastError::InsufficientSamples { .. }
        )
    }

    /// Minimum number of observations or samples named by the error
    pub fn required_minimum(&self) -> Option<usize> {
        match self {
            ForecastError::InsufficientData { required, .. }
            | ForecastError::InsufficientSamples { required, .. } => Some(*required),
            _ => None,
        }
    }
}
