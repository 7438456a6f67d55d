//! Hyperparameters shared by all forecast model kinds

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ARIMA (p, d, q) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// Autoregressive order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// Moving-average order
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Training hyperparameters
///
/// Neural kinds use the windowing and optimiser fields, ARIMA only reads
/// `arima_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Lookback window length L
    pub lookback: usize,
    /// Number of passes over the training windows
    pub epochs: usize,
    /// Windows per gradient step
    pub batch_size: usize,
    /// Share of windows (taken from the end) held out for validation
    pub validation_split: f64,
    /// Adam step size for the output layer
    pub learning_rate: f64,
    /// Dropout rate between stacked layers
    pub dropout: f64,
    /// Width of every recurrent layer
    pub recurrent_units: usize,
    /// Filters per 1-D convolution (CNN-LSTM)
    pub conv_filters: usize,
    /// Convolution kernel width (CNN-LSTM)
    pub kernel_size: usize,
    /// Max-pooling width (CNN-LSTM)
    pub pool_size: usize,
    /// Order for the autoregressive kind
    pub arima_order: ArimaOrder,
    /// Seed for weight initialisation and dropout masks
    pub seed: u64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            lookback: 60,
            epochs: 50,
            batch_size: 32,
            validation_split: 0.1,
            learning_rate: 0.01,
            dropout: 0.2,
            recurrent_units: 50,
            conv_filters: 64,
            kernel_size: 3,
            pool_size: 2,
            arima_order: ArimaOrder::default(),
            seed: 42,
        }
    }
}

impl Hyperparameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_validation_split(mut self, split: f64) -> Self {
        self.validation_split = split;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_recurrent_units(mut self, units: usize) -> Self {
        self.recurrent_units = units;
        self
    }

    pub fn with_arima_order(mut self, order: ArimaOrder) -> Self {
        self.arima_order = order;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject values no model can be built from
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.lookback >= 1, "lookback must be at least 1"),
            (self.epochs >= 1, "epochs must be at least 1"),
            (self.batch_size >= 1, "batch_size must be at least 1"),
            (self.recurrent_units >= 1, "recurrent_units must be at least 1"),
            (self.conv_filters >= 1, "conv_filters must be at least 1"),
            (self.kernel_size >= 1, "kernel_size must be at least 1"),
            (self.pool_size >= 1, "pool_size must be at least 1"),
            (
                (0.0..1.0).contains(&self.validation_split),
                "validation_split must be in [0, 1)",
            ),
            ((0.0..1.0).contains(&self.dropout), "dropout must be in [0, 1)"),
            (
                self.learning_rate > 0.0 && self.learning_rate.is_finite(),
                "learning_rate must be positive",
            ),
        ];

        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(ForecastError::InvalidParameters((*message).to_string())),
            None => Ok(()),
        }
    }
}
