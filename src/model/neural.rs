//! Neural forecaster: scaling, windowing and the sequence network together

use super::architecture::Architecture;
use super::config::Hyperparameters;
use super::forecast::{CancelToken, Forecaster};
use super::network::{FitSummary, SequenceNetwork};
use super::types::ModelKind;
use crate::defaults::MIN_EXTRA_OBSERVATIONS;
use crate::error::{ForecastError, Result};
use crate::preprocessing::{denormalize, make_windows, normalize, train_validation_split, Scaler};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Trained LSTM, GRU or CNN-LSTM forecaster
#[derive(Debug, Clone)]
pub struct NeuralForecaster {
    network: SequenceNetwork,
    scaler: Scaler,
    /// Last `lookback` normalized closes of the training series
    context: Vec<f64>,
}

impl NeuralForecaster {
    /// Minimum series length for a lookback of `lookback`
    pub fn required_observations(lookback: usize) -> usize {
        lookback + MIN_EXTRA_OBSERVATIONS
    }

    /// Fit a network of `kind` on closing prices
    pub fn fit(
        kind: ModelKind,
        closes: &[f64],
        hp: &Hyperparameters,
        cancel: &CancelToken,
    ) -> Result<(Self, FitSummary)> {
        let required = Self::required_observations(hp.lookback);
        if closes.len() < required {
            return Err(ForecastError::InsufficientData {
                required,
                actual: closes.len(),
            });
        }

        let (normalized, scaler) = normalize(closes)?;
        let windows = make_windows(&normalized, hp.lookback)?;
        let (train, validation) = train_validation_split(&windows, hp.validation_split);

        let architecture = Architecture::for_kind(kind, hp)?;
        let mut rng = StdRng::seed_from_u64(hp.seed);
        let mut network = SequenceNetwork::build(&architecture, hp.lookback, &mut rng)?;

        tracing::debug!(
            "Fitting {} on {} training / {} validation windows",
            architecture,
            train.len(),
            validation.len()
        );
        let summary = network.fit(train, validation, hp, &mut rng, cancel)?;

        let context = normalized[normalized.len() - hp.lookback..].to_vec();
        Ok((
            Self {
                network,
                scaler,
                context,
            },
            summary,
        ))
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }
}

impl Forecaster for NeuralForecaster {
    fn forecast(&self, horizon: usize) -> Vec<f64> {
        let normalized = self.network.forecast_normalized(&self.context, horizon);
        denormalize(&normalized, &self.scaler)
    }
}
