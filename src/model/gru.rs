//! GRU (Gated Recurrent Unit) cell and layer
//!
//! Lighter than LSTM: two gates (update, reset) and no separate cell state.

use super::layers::sigmoid;
use ndarray::{s, Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// GRU cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GRUCell {
    pub input_size: usize,
    pub hidden_size: usize,

    // Update gate
    w_iz: Array2<f64>,
    w_hz: Array2<f64>,
    b_z: Array1<f64>,

    // Reset gate
    w_ir: Array2<f64>,
    w_hr: Array2<f64>,
    b_r: Array1<f64>,

    // Candidate
    w_in: Array2<f64>,
    w_hn: Array2<f64>,
    b_n: Array1<f64>,
}

impl GRUCell {
    pub fn new_using<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let dist = Uniform::new(-limit, limit);

        Self {
            input_size,
            hidden_size,
            w_iz: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hz: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_z: Array1::zeros(hidden_size),
            w_ir: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hr: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_r: Array1::zeros(hidden_size),
            w_in: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hn: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_n: Array1::zeros(hidden_size),
        }
    }

    /// One time step, returns the next hidden state
    pub fn forward(&self, x: &Array1<f64>, h_prev: &Array1<f64>) -> Array1<f64> {
        // z = σ(W_iz x + W_hz h + b_z)
        let z_gate = (self.w_iz.dot(x) + self.w_hz.dot(h_prev) + &self.b_z).mapv(sigmoid);
        // r = σ(W_ir x + W_hr h + b_r)
        let r_gate = (self.w_ir.dot(x) + self.w_hr.dot(h_prev) + &self.b_r).mapv(sigmoid);
        // n = tanh(W_in x + W_hn (r ⊙ h) + b_n)
        let n = (self.w_in.dot(x) + self.w_hn.dot(&(&r_gate * h_prev)) + &self.b_n)
            .mapv(f64::tanh);

        // h = (1 - z) ⊙ n + z ⊙ h_prev
        let one_minus_z = z_gate.mapv(|v| 1.0 - v);
        &one_minus_z * &n + &z_gate * h_prev
    }

    pub fn init_hidden(&self) -> Array1<f64> {
        Array1::zeros(self.hidden_size)
    }
}

/// GRU layer unrolled over a sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GRULayer {
    cell: GRUCell,
    return_sequences: bool,
}

impl GRULayer {
    pub fn new_using<R: Rng>(
        input_size: usize,
        units: usize,
        return_sequences: bool,
        rng: &mut R,
    ) -> Self {
        Self {
            cell: GRUCell::new_using(input_size, units, rng),
            return_sequences,
        }
    }

    pub fn units(&self) -> usize {
        self.cell.hidden_size
    }

    /// Input [seq_len, input_size] -> [seq_len, units] or [1, units]
    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        let seq_len = input.nrows();
        let rows = if self.return_sequences { seq_len } else { 1 };
        let mut output = Array2::zeros((rows, self.units()));

        let mut h = self.cell.init_hidden();
        for t in 0..seq_len {
            h = self.cell.forward(&input.row(t).to_owned(), &h);
            if self.return_sequences {
                output.slice_mut(s![t, ..]).assign(&h);
            }
        }

        if !self.return_sequences {
            output.slice_mut(s![0, ..]).assign(&h);
        }
        output
    }
}
