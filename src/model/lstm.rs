//! LSTM (Long Short-Term Memory) cell and layer

use super::layers::sigmoid;
use ndarray::{s, Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// LSTM cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LSTMCell {
    pub input_size: usize,
    pub hidden_size: usize,

    // Input gate
    w_ii: Array2<f64>,
    w_hi: Array2<f64>,
    b_i: Array1<f64>,

    // Forget gate
    w_if: Array2<f64>,
    w_hf: Array2<f64>,
    b_f: Array1<f64>,

    // Cell candidate
    w_ig: Array2<f64>,
    w_hg: Array2<f64>,
    b_g: Array1<f64>,

    // Output gate
    w_io: Array2<f64>,
    w_ho: Array2<f64>,
    b_o: Array1<f64>,
}

impl LSTMCell {
    /// Create a cell with weights drawn from U(-1/sqrt(h), 1/sqrt(h))
    pub fn new_using<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let dist = Uniform::new(-limit, limit);

        Self {
            input_size,
            hidden_size,
            w_ii: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hi: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_i: Array1::zeros(hidden_size),
            w_if: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hf: Array2::random_using((hidden_size, hidden_size), dist, rng),
            // forget bias starts at 1
            b_f: Array1::from_elem(hidden_size, 1.0),
            w_ig: Array2::random_using((hidden_size, input_size), dist, rng),
            w_hg: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_g: Array1::zeros(hidden_size),
            w_io: Array2::random_using((hidden_size, input_size), dist, rng),
            w_ho: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_o: Array1::zeros(hidden_size),
        }
    }

    /// One time step
    ///
    /// Returns the next (hidden, cell) state.
    pub fn forward(
        &self,
        x: &Array1<f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        // i = σ(W_ii x + W_hi h + b_i)
        let i_gate = (self.w_ii.dot(x) + self.w_hi.dot(h_prev) + &self.b_i).mapv(sigmoid);
        // f = σ(W_if x + W_hf h + b_f)
        let f_gate = (self.w_if.dot(x) + self.w_hf.dot(h_prev) + &self.b_f).mapv(sigmoid);
        // g = tanh(W_ig x + W_hg h + b_g)
        let g = (self.w_ig.dot(x) + self.w_hg.dot(h_prev) + &self.b_g).mapv(f64::tanh);
        // o = σ(W_io x + W_ho h + b_o)
        let o_gate = (self.w_io.dot(x) + self.w_ho.dot(h_prev) + &self.b_o).mapv(sigmoid);

        let c_next = &f_gate * c_prev + &i_gate * &g;
        let h_next = &o_gate * &c_next.mapv(f64::tanh);

        (h_next, c_next)
    }

    pub fn init_hidden(&self) -> (Array1<f64>, Array1<f64>) {
        (
            Array1::zeros(self.hidden_size),
            Array1::zeros(self.hidden_size),
        )
    }
}

/// LSTM layer unrolled over a sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LSTMLayer {
    cell: LSTMCell,
    /// Emit every hidden state instead of only the last one
    return_sequences: bool,
}

impl LSTMLayer {
    pub fn new_using<R: Rng>(
        input_size: usize,
        units: usize,
        return_sequences: bool,
        rng: &mut R,
    ) -> Self {
        Self {
            cell: LSTMCell::new_using(input_size, units, rng),
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

        let (mut h, mut c) = self.cell.init_hidden();
        for t in 0..seq_len {
            let x = input.row(t).to_owned();
            let (h_next, c_next) = self.cell.forward(&x, &h, &c);
            h = h_next;
            c = c_next;

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

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lstm_cell() {
        let mut rng = StdRng::seed_from_u64(3);
        let cell = LSTMCell::new_using(5, 10, &mut rng);
        let x = Array1::zeros(5);
        let (h, c) = cell.init_hidden();

        let (h_next, c_next) = cell.forward(&x, &h, &c);

        assert_eq!(h_next.len(), 10);
        assert_eq!(c_next.len(), 10);
        assert!(h_next.iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn test_layer_shapes() {
        let mut rng = StdRng::seed_from_u64(3);
        let input = Array2::from_elem((12, 1), 0.5);

        let seq = LSTMLayer::new_using(1, 8, true, &mut rng);
        assert_eq!(seq.forward(&input).shape(), &[12, 8]);

        let last = LSTMLayer::new_using(8, 4, false, &mut rng);
        assert_eq!(last.forward(&seq.forward(&input)).shape(), &[1, 4]);
    }

    #[test]
    fn test_same_seed_same_output() {
        let input = Array2::from_shape_fn((6, 1), |(t, _)| t as f64 / 6.0);
        let a = LSTMLayer::new_using(1, 4, false, &mut StdRng::seed_from_u64(9));
        let b = LSTMLayer::new_using(1, 4, false, &mut StdRng::seed_from_u64(9));
        assert_eq!(a.forward(&input), b.forward(&input));
    }
}
