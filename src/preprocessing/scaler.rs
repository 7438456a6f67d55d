//! Min-max scaling of a price series

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Min/max of the closing prices a model was trained on
///
/// Immutable once fitted; bound to exactly one trained model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    min: f64,
    max: f64,
}

impl Scaler {
    /// Compute min/max of a series
    ///
    /// Fails on an empty series, non-finite values, or when all values are
    /// equal (the range would be zero).
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::Data("cannot normalize an empty series".into()));
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(ForecastError::Data(format!("series contains non-finite value {}", v)));
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if max <= min {
            return Err(ForecastError::Data(format!(
                "series needs at least 2 distinct values (all values are {})",
                min
            )));
        }

        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Raw value -> [0, 1] (values outside the fitted range map outside it)
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }

    /// Normalized value -> raw scale
    pub fn inverse(&self, value: f64) -> f64 {
        value * self.range() + self.min
    }
}

/// Normalize a series into [0, 1], returning the scaler used
pub fn normalize(values: &[f64]) -> Result<(Vec<f64>, Scaler)> {
    let scaler = Scaler::fit(values)?;
    let normalized = values.iter().map(|&v| scaler.transform(v)).collect();
    Ok((normalized, scaler))
}

/// Exact inverse of [`normalize`]
pub fn denormalize(values: &[f64], scaler: &Scaler) -> Vec<f64> {
    values.iter().map(|&v| scaler.inverse(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_range() {
        let (normalized, scaler) = normalize(&[5.0, 10.0, 7.5]).unwrap();
        assert_eq!(normalized, vec![0.0, 1.0, 0.5]);
        assert_eq!(scaler.min(), 5.0);
        assert_eq!(scaler.max(), 10.0);
    }

    #[test]
    fn test_round_trip() {
        let values: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 12.5 + i as f64 * 0.01)
            .collect();
        let (normalized, scaler) = normalize(&values).unwrap();
        let restored = denormalize(&normalized, &scaler);

        for (a, b) in values.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_degenerate_series() {
        assert!(matches!(normalize(&[3.0, 3.0, 3.0]), Err(ForecastError::Data(_))));
        assert!(matches!(normalize(&[]), Err(ForecastError::Data(_))));
        assert!(normalize(&[1.0, f64::NAN]).is_err());
    }
}
