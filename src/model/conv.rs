//! 1-D convolution and max pooling over time
//!
//! Sequences are laid out as [time_steps, channels].

use super::layers::Activation;
use ndarray::{s, Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 1-D convolution with "valid" padding and stride 1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv1d {
    pub in_channels: usize,
    pub filters: usize,
    pub kernel_size: usize,
    pub activation: Activation,
    /// Weights [filters, kernel_size * in_channels], time-major within a row
    weights: Array2<f64>,
    /// Bias per filter
    bias: Array1<f64>,
}

impl Conv1d {
    /// He-uniform initialised convolution
    pub fn new_using<R: Rng>(
        in_channels: usize,
        filters: usize,
        kernel_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let fan_in = in_channels * kernel_size;
        let limit = (6.0 / fan_in as f64).sqrt();

        Self {
            in_channels,
            filters,
            kernel_size,
            activation,
            weights: Array2::random_using((filters, fan_in), Uniform::new(-limit, limit), rng),
            bias: Array1::zeros(filters),
        }
    }

    /// Output length for an input of `input_length` steps (0 if too short)
    pub fn output_length(&self, input_length: usize) -> usize {
        (input_length + 1).saturating_sub(self.kernel_size)
    }

    /// [T, in_channels] -> [T - kernel_size + 1, filters]
    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        let out_len = self.output_length(input.nrows());
        let mut output = Array2::zeros((out_len, self.filters));

        for t in 0..out_len {
            let patch: Array1<f64> = input
                .slice(s![t..t + self.kernel_size, ..])
                .iter()
                .copied()
                .collect();
            let response = self.weights.dot(&patch) + &self.bias;
            output
                .slice_mut(s![t, ..])
                .assign(&self.activation.apply_array(&response));
        }

        output
    }
}

/// Non-overlapping max pooling over time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MaxPool1d {
    pub pool_size: usize,
}

impl MaxPool1d {
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size }
    }

    pub fn output_length(&self, input_length: usize) -> usize {
        input_length / self.pool_size.max(1)
    }

    /// [T, C] -> [T / pool_size, C]
    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        let pool = self.pool_size.max(1);
        let out_len = self.output_length(input.nrows());
        let mut output = Array2::zeros((out_len, input.ncols()));

        for t in 0..out_len {
            let block = input.slice(s![t * pool..(t + 1) * pool, ..]);
            for (c, column) in block.columns().into_iter().enumerate() {
                output[[t, c]] = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            }
        }

        output
    }
}
