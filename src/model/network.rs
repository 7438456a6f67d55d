//! Sequence network shared by the LSTM, GRU and CNN-LSTM forecasters
//!
//! The convolutional and recurrent layers keep their seeded random
//! initialisation and act as a fixed feature extractor, the same way a
//! reservoir does. Only the dense output layer is fitted: features are
//! computed once per window and the readout is trained on them with
//! mini-batch Adam against the mean squared error.

use super::architecture::{Architecture, LayerSpec};
use super::config::Hyperparameters;
use super::conv::{Conv1d, MaxPool1d};
use super::forecast::CancelToken;
use super::gru::GRULayer;
use super::layers::{Activation, Adam, Dense};
use super::lstm::LSTMLayer;
use crate::error::{ForecastError, Result};
use crate::preprocessing::{windows_to_arrays, Window};
use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;

#[derive(Debug, Clone)]
enum Layer {
    Lstm(LSTMLayer),
    Gru(GRULayer),
    Conv(Conv1d),
    Pool(MaxPool1d),
    /// Identity outside the readout fit
    Dropout,
}

impl Layer {
    fn forward(&self, input: Array2<f64>) -> Array2<f64> {
        match self {
            Layer::Lstm(layer) => layer.forward(&input),
            Layer::Gru(layer) => layer.forward(&input),
            Layer::Conv(layer) => layer.forward(&input),
            Layer::Pool(layer) => layer.forward(&input),
            Layer::Dropout => input,
        }
    }
}

/// Losses collected while fitting the readout
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub final_loss: f64,
    pub validation_loss: Option<f64>,
    pub epochs_run: usize,
    pub loss_history: Vec<f64>,
}

/// Layer stack with a trainable dense readout
#[derive(Debug, Clone)]
pub struct SequenceNetwork {
    architecture: Architecture,
    layers: Vec<Layer>,
    readout: Dense,
    readout_dropout: f64,
}

impl SequenceNetwork {
    /// Instantiate `architecture` for univariate input windows of `lookback` steps
    pub fn build(architecture: &Architecture, lookback: usize, rng: &mut StdRng) -> Result<Self> {
        architecture.recurrent_input_length(lookback)?;

        let mut channels = 1;
        let mut layers = Vec::with_capacity(architecture.layers.len());
        let mut readout = None;

        for spec in &architecture.layers {
            match *spec {
                LayerSpec::Lstm { units, return_sequences } => {
                    layers.push(Layer::Lstm(LSTMLayer::new_using(
                        channels,
                        units,
                        return_sequences,
                        rng,
                    )));
                    channels = units;
                }
                LayerSpec::Gru { units, return_sequences } => {
                    layers.push(Layer::Gru(GRULayer::new_using(
                        channels,
                        units,
                        return_sequences,
                        rng,
                    )));
                    channels = units;
                }
                LayerSpec::Conv1d { filters, kernel_size } => {
                    layers.push(Layer::Conv(Conv1d::new_using(
                        channels,
                        filters,
                        kernel_size,
                        Activation::ReLU,
                        rng,
                    )));
                    channels = filters;
                }
                LayerSpec::MaxPool1d { pool_size } => {
                    layers.push(Layer::Pool(MaxPool1d::new(pool_size)));
                }
                LayerSpec::Dropout { .. } => layers.push(Layer::Dropout),
                LayerSpec::Dense { units } => {
                    readout = Some(Dense::new_using(channels, units, Activation::Linear, rng));
                }
            }
        }

        let readout = readout.ok_or_else(|| {
            ForecastError::InvalidParameters(format!("{} has no output layer", architecture.kind))
        })?;

        Ok(Self {
            architecture: architecture.clone(),
            layers,
            readout,
            readout_dropout: architecture.output_dropout(),
        })
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    /// Output of the frozen layers for one window [lookback, 1]
    ///
    /// Returns the last time step of the final sequence.
    pub fn features(&self, window: &Array2<f64>) -> Array1<f64> {
        let output = self
            .layers
            .iter()
            .fold(window.clone(), |input, layer| layer.forward(input));
        let last = output.nrows().saturating_sub(1);
        output.row(last).to_owned()
    }

    /// Next normalized value after `context`
    pub fn predict_one(&self, context: &[f64]) -> f64 {
        let window = Array2::from_shape_fn((context.len(), 1), |(t, _)| context[t]);
        self.readout.forward(&self.features(&window))[0]
    }

    /// Fit the readout on training windows, reporting validation loss on `validation`
    pub fn fit(
        &mut self,
        train: &[Window],
        validation: &[Window],
        hp: &Hyperparameters,
        rng: &mut StdRng,
        cancel: &CancelToken,
    ) -> Result<FitSummary> {
        if train.is_empty() {
            return Err(ForecastError::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }

        let (train_x, train_y) = self.feature_matrix(train, cancel)?;
        let validation_set = if validation.is_empty() {
            None
        } else {
            Some(self.feature_matrix(validation, cancel)?)
        };

        let mut optimizer = Adam::new(&self.readout, hp.learning_rate);
        let batch_size = hp.batch_size.max(1);
        let keep = 1.0 - self.readout_dropout;
        let n = train_x.nrows();

        let mut loss_history = Vec::with_capacity(hp.epochs);
        let mut validation_loss = None;

        for epoch in 0..hp.epochs {
            if cancel.is_cancelled() {
                return Err(ForecastError::Cancelled);
            }

            for start in (0..n).step_by(batch_size) {
                let end = (start + batch_size).min(n);
                let mut batch = train_x.slice(s![start..end, ..]).to_owned();
                if self.readout_dropout > 0.0 {
                    batch.mapv_inplace(|v| if rng.gen_bool(keep) { v / keep } else { 0.0 });
                }
                let targets = train_y.slice(s![start..end]);

                let predictions = batch.dot(&self.readout.weights.row(0)) + self.readout.biases[0];
                let errors = &predictions - &targets;
                let scale = 2.0 / (end - start) as f64;

                let grad_w = (errors.dot(&batch) * scale).insert_axis(Axis(0));
                let grad_b = Array1::from_elem(1, errors.sum() * scale);
                optimizer.update(&mut self.readout, &grad_w, &grad_b);
            }

            let loss = self.readout_mse(&train_x, &train_y);
            if !loss.is_finite() {
                return Err(ForecastError::Training(format!(
                    "loss diverged at epoch {}",
                    epoch + 1
                )));
            }
            loss_history.push(loss);
            validation_loss = validation_set
                .as_ref()
                .map(|(x, y)| self.readout_mse(x, y));

            tracing::debug!(
                "Epoch {}: loss = {:.6}, val_loss = {:?}",
                epoch + 1,
                loss,
                validation_loss
            );
        }

        Ok(FitSummary {
            final_loss: loss_history.last().copied().unwrap_or(f64::NAN),
            validation_loss,
            epochs_run: loss_history.len(),
            loss_history,
        })
    }

    /// Roll the network forward `horizon` steps from the last `lookback` values
    ///
    /// Each prediction is appended to the window before the next step.
    pub fn forecast_normalized(&self, context: &[f64], horizon: usize) -> Vec<f64> {
        let mut window = context.to_vec();
        let mut forecasts = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let next = self.predict_one(&window);
            forecasts.push(next);
            window.remove(0);
            window.push(next);
        }

        forecasts
    }

    /// Features [n, width] and targets [n] for a set of windows
    fn feature_matrix(
        &self,
        windows: &[Window],
        cancel: &CancelToken,
    ) -> Result<(Array2<f64>, Array1<f64>)> {
        let (x, y) = windows_to_arrays(windows);

        let rows: Vec<Array1<f64>> = (0..windows.len())
            .into_par_iter()
            .map(|i| {
                if cancel.is_cancelled() {
                    return Err(ForecastError::Cancelled);
                }
                Ok(self.features(&x.index_axis(Axis(0), i).to_owned()))
            })
            .collect::<Result<_>>()?;

        let width = self.readout.input_size();
        let mut features = Array2::zeros((rows.len(), width));
        for (i, row) in rows.iter().enumerate() {
            features.row_mut(i).assign(row);
        }

        Ok((features, y.column(0).to_owned()))
    }

    fn readout_mse(&self, features: &Array2<f64>, targets: &Array1<f64>) -> f64 {
        let predictions = features.dot(&self.readout.weights.row(0)) + self.readout.biases[0];
        (&predictions - targets).mapv(|e| e * e).mean().unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::ModelKind;
    use crate::preprocessing::make_windows;
    use rand::SeedableRng;

    fn small_hp() -> Hyperparameters {
        Hyperparameters::new()
            .with_lookback(10)
            .with_recurrent_units(8)
            .with_epochs(20)
            .with_batch_size(8)
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 0.5 + 0.4 * (i as f64 * 0.3).sin())
            .collect()
    }

    #[test]
    fn test_feature_width_matches_readout() {
        let hp = small_hp();
        let mut rng = StdRng::seed_from_u64(1);
        for kind in [ModelKind::Lstm, ModelKind::Gru, ModelKind::CnnLstm] {
            let arch = Architecture::for_kind(kind, &hp).unwrap();
            let net = SequenceNetwork::build(&arch, hp.lookback, &mut rng).unwrap();
            let features = net.features(&Array2::from_elem((10, 1), 0.5));
            assert_eq!(features.len(), 8, "{}", kind);
        }
    }

    #[test]
    fn test_fit_reduces_loss() {
        let hp = small_hp();
        let mut rng = StdRng::seed_from_u64(2);
        let arch = Architecture::for_kind(ModelKind::Lstm, &hp).unwrap();
        let mut net = SequenceNetwork::build(&arch, hp.lookback, &mut rng).unwrap();

        let windows = make_windows(&wave(80), hp.lookback).unwrap();
        let (train, val) = windows.split_at(63);
        let summary = net
            .fit(train, val, &hp, &mut rng, &CancelToken::new())
            .unwrap();

        assert_eq!(summary.epochs_run, 20);
        assert!(summary.validation_loss.is_some());
        assert!(summary.final_loss <= summary.loss_history[0]);
    }

    #[test]
    fn test_cancelled_fit() {
        let hp = small_hp();
        let mut rng = StdRng::seed_from_u64(3);
        let arch = Architecture::for_kind(ModelKind::Gru, &hp).unwrap();
        let mut net = SequenceNetwork::build(&arch, hp.lookback, &mut rng).unwrap();
        let windows = make_windows(&wave(40), hp.lookback).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = net.fit(&windows, &[], &hp, &mut rng, &cancel).unwrap_err();
        assert_eq!(err, ForecastError::Cancelled);
    }

    #[test]
    fn test_forecast_length() {
        let hp = small_hp();
        let mut rng = StdRng::seed_from_u64(4);
        let arch = Architecture::for_kind(ModelKind::CnnLstm, &hp).unwrap();
        let net = SequenceNetwork::build(&arch, hp.lookback, &mut rng).unwrap();

        let forecasts = net.forecast_normalized(&wave(10), 5);
        assert_eq!(forecasts.len(), 5);
        assert!(net.forecast_normalized(&wave(10), 0).is_empty());
    }
}
