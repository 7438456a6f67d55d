//! Layer stacks of the neural forecasters
//!
//! The three neural kinds share one lifecycle and training loop and differ
//! only in the layer stack described here. Feature layers are frozen after
//! initialisation and only the output layer is fitted, so a stack carries a
//! single dropout, on the features feeding that output layer.

use super::config::Hyperparameters;
use super::types::ModelKind;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of a layer stack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LayerSpec {
    Lstm { units: usize, return_sequences: bool },
    Gru { units: usize, return_sequences: bool },
    /// ReLU-activated 1-D convolution
    Conv1d { filters: usize, kernel_size: usize },
    MaxPool1d { pool_size: usize },
    Dropout { rate: f64 },
    Dense { units: usize },
}

impl fmt::Display for LayerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSpec::Lstm { units, return_sequences } => {
                write!(f, "LSTM({}{})", units, if *return_sequences { ", seq" } else { "" })
            }
            LayerSpec::Gru { units, return_sequences } => {
                write!(f, "GRU({}{})", units, if *return_sequences { ", seq" } else { "" })
            }
            LayerSpec::Conv1d { filters, kernel_size } => {
                write!(f, "Conv1D({}x{}, relu)", filters, kernel_size)
            }
            LayerSpec::MaxPool1d { pool_size } => write!(f, "MaxPool1D({})", pool_size),
            LayerSpec::Dropout { rate } => write!(f, "Dropout({})", rate),
            LayerSpec::Dense { units } => write!(f, "Dense({})", units),
        }
    }
}

/// Layer stack for one neural model kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub kind: ModelKind,
    pub layers: Vec<LayerSpec>,
}

impl Architecture {
    /// Stack for `kind`; ARIMA has no layer stack
    pub fn for_kind(kind: ModelKind, hp: &Hyperparameters) -> Result<Self> {
        match kind {
            ModelKind::Lstm | ModelKind::Gru => Ok(Self::stacked_recurrent(kind, hp)),
            ModelKind::CnnLstm => Ok(Self::conv_recurrent(hp)),
            ModelKind::Arima => Err(ForecastError::InvalidParameters(
                "ARIMA is not a neural architecture".into(),
            )),
        }
    }

    /// recurrent(seq) -> recurrent -> dropout -> dense(1)
    fn stacked_recurrent(kind: ModelKind, hp: &Hyperparameters) -> Self {
        let recurrent = |return_sequences| match kind {
            ModelKind::Gru => LayerSpec::Gru {
                units: hp.recurrent_units,
                return_sequences,
            },
            _ => LayerSpec::Lstm {
                units: hp.recurrent_units,
                return_sequences,
            },
        };

        Self {
            kind,
            layers: vec![
                recurrent(true),
                recurrent(false),
                LayerSpec::Dropout { rate: hp.dropout },
                LayerSpec::Dense { units: 1 },
            ],
        }
    }

    /// conv -> conv -> pool -> lstm -> dropout -> dense(1)
    fn conv_recurrent(hp: &Hyperparameters) -> Self {
        let conv = LayerSpec::Conv1d {
            filters: hp.conv_filters,
            kernel_size: hp.kernel_size,
        };

        Self {
            kind: ModelKind::CnnLstm,
            layers: vec![
                conv,
                conv,
                LayerSpec::MaxPool1d {
                    pool_size: hp.pool_size,
                },
                LayerSpec::Lstm {
                    units: hp.recurrent_units,
                    return_sequences: false,
                },
                LayerSpec::Dropout { rate: hp.dropout },
                LayerSpec::Dense { units: 1 },
            ],
        }
    }

    /// Number of time steps reaching the first recurrent layer
    ///
    /// Fails when convolutions and pooling consume the whole lookback window.
    pub fn recurrent_input_length(&self, lookback: usize) -> Result<usize> {
        let mut length = lookback;
        for layer in &self.layers {
            match layer {
                LayerSpec::Conv1d { kernel_size, .. } => {
                    length = (length + 1).saturating_sub(*kernel_size);
                }
                LayerSpec::MaxPool1d { pool_size } => length /= (*pool_size).max(1),
                LayerSpec::Lstm { .. } | LayerSpec::Gru { .. } => break,
                _ => {}
            }
            if length == 0 {
                return Err(ForecastError::InvalidParameters(format!(
                    "lookback {} is too short for the {} layer stack",
                    lookback, self.kind
                )));
            }
        }
        Ok(length)
    }

    /// Rate of the dropout feeding the output layer, 0 if there is none
    pub fn output_dropout(&self) -> f64 {
        match self.layers.iter().rev().nth(1) {
            Some(LayerSpec::Dropout { rate }) => *rate,
            _ => 0.0,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layers: Vec<String> = self.layers.iter().map(|l| l.to_string()).collect();
        write!(f, "{}: {}", self.kind, layers.join(" -> "))
    }
}
