//! # Forecast models
//!
//! Four model kinds share one lifecycle:
//!
//! - **ARIMA**: differencing plus an ARMA fit by least squares
//! - **LSTM** / **GRU**: two stacked recurrent layers with dropout
//! - **CNN-LSTM**: two 1-D convolutions and max pooling feeding an LSTM
//!
//! Neural kinds min-max scale the closes, cut them into lookback windows and
//! fit the dense output layer on features from the recurrent stack.
//! Forecasts are produced recursively: each prediction is fed back into the
//! window for the next step.

mod architecture;
mod arima;
mod config;
mod conv;
mod forecast;
mod gru;
mod layers;
mod lstm;
mod network;
mod neural;
mod types;

pub use architecture::{Architecture, LayerSpec};
pub use arima::{difference, ArimaForecaster, ArimaModel};
pub use config::{ArimaOrder, Hyperparameters};
pub use conv::{Conv1d, MaxPool1d};
pub use forecast::{fit_model, CancelToken, ForecastModel, Forecaster, TrainedModel};
pub use gru::{GRUCell, GRULayer};
pub use layers::{Activation, Adam, Dense};
pub use lstm::{LSTMCell, LSTMLayer};
pub use network::{FitSummary, SequenceNetwork};
pub use neural::NeuralForecaster;
pub use types::{
    confidence_for_day, ArimaDiagnostics, FailureReason, ModelKind, ModelState, Prediction,
    PredictionSet, TrainingReport,
};
