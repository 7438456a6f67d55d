//! Dense layer, activations and the Adam optimiser for it

use ndarray::{Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Element-wise activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// Identity
    Linear,
    /// max(0, x)
    ReLU,
    /// Hyperbolic tangent
    Tanh,
    /// 1 / (1 + exp(-x))
    Sigmoid,
}

impl Activation {
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::ReLU => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
        }
    }

    pub fn apply_array(&self, x: &Array1<f64>) -> Array1<f64> {
        x.mapv(|v| self.apply(v))
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Fully connected layer: y = act(W x + b)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    /// Weights [output_size, input_size]
    pub weights: Array2<f64>,
    /// Biases [output_size]
    pub biases: Array1<f64>,
    pub activation: Activation,
}

impl Dense {
    /// Xavier-uniform initialised layer
    pub fn new_using<R: Rng>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (input_size + output_size) as f64).sqrt();
        Self {
            weights: Array2::random_using((output_size, input_size), Uniform::new(-limit, limit), rng),
            biases: Array1::zeros(output_size),
            activation,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        self.activation.apply_array(&(self.weights.dot(x) + &self.biases))
    }
}

/// Adam optimiser state for one [`Dense`] layer
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    m_w: Array2<f64>,
    v_w: Array2<f64>,
    m_b: Array1<f64>,
    v_b: Array1<f64>,
}

impl Adam {
    pub fn new(layer: &Dense, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
            m_w: Array2::zeros(layer.weights.raw_dim()),
            v_w: Array2::zeros(layer.weights.raw_dim()),
            m_b: Array1::zeros(layer.biases.raw_dim()),
            v_b: Array1::zeros(layer.biases.raw_dim()),
        }
    }

    /// Apply one update given the loss gradients
    pub fn update(&mut self, layer: &mut Dense, grad_w: &Array2<f64>, grad_b: &Array1<f64>) {
        self.step += 1;
        let (b1, b2) = (self.beta1, self.beta2);

        self.m_w = &self.m_w * b1 + grad_w * (1.0 - b1);
        self.v_w = &self.v_w * b2 + &grad_w.mapv(|g| g * g) * (1.0 - b2);
        self.m_b = &self.m_b * b1 + grad_b * (1.0 - b1);
        self.v_b = &self.v_b * b2 + &grad_b.mapv(|g| g * g) * (1.0 - b2);

        let correction1 = 1.0 - b1.powi(self.step);
        let correction2 = 1.0 - b2.powi(self.step);
        let lr = self.learning_rate;
        let eps = self.epsilon;

        ndarray::Zip::from(&mut layer.weights)
            .and(&self.m_w)
            .and(&self.v_w)
            .for_each(|w, &m, &v| {
                *w -= lr * (m / correction1) / ((v / correction2).sqrt() + eps);
            });
        ndarray::Zip::from(&mut layer.biases)
            .and(&self.m_b)
            .and(&self.v_b)
            .for_each(|b, &m, &v| {
                *b -= lr * (m / correction1) / ((v / correction2).sqrt() + eps);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_activations() {
        assert_eq!(Activation::ReLU.apply(-2.0), 0.0);
        assert_eq!(Activation::ReLU.apply(3.0), 3.0);
        assert_eq!(Activation::Linear.apply(-1.5), -1.5);
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_dense_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = Dense::new_using(8, 1, Activation::Linear, &mut rng);
        let out = layer.forward(&Array1::ones(8));
        assert_eq!(out.len(), 1);
        assert_eq!(layer.input_size(), 8);
        assert_eq!(layer.output_size(), 1);
    }

    #[test]
    fn test_adam_moves_against_gradient() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = Dense::new_using(2, 1, Activation::Linear, &mut rng);
        let before = layer.weights.clone();
        let mut adam = Adam::new(&layer, 0.1);

        let grad_w = Array2::from_elem((1, 2), 1.0);
        let grad_b = Array1::from_elem(1, -1.0);
        adam.update(&mut layer, &grad_w, &grad_b);

        assert!(layer.weights[[0, 0]] < before[[0, 0]]);
        assert!(layer.biases[0] > 0.0);
    }
}
