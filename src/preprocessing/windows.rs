//! Sliding supervised windows over a normalized series

use crate::error::{ForecastError, Result};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// One supervised sample: `lookback` consecutive values and the value after them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub context: Vec<f64>,
    pub target: f64,
}

/// Slide a window of length `lookback` across the series with stride 1
///
/// A series of length N yields exactly N - lookback windows, in original
/// order (no shuffling).
pub fn make_windows(normalized: &[f64], lookback: usize) -> Result<Vec<Window>> {
    if lookback == 0 {
        return Err(ForecastError::InvalidParameters(
            "lookback window must be at least 1".into(),
        ));
    }
    if normalized.len() <= lookback {
        return Err(ForecastError::InsufficientData {
            required: lookback + 1,
            actual: normalized.len(),
        });
    }

    Ok((lookback..normalized.len())
        .map(|i| Window {
            context: normalized[i - lookback..i].to_vec(),
            target: normalized[i],
        })
        .collect())
}

/// Keep the last `validation_split` share of windows for validation
///
/// Returns (train, validation). The training part always keeps at least one
/// window; the validation part may be empty.
pub fn train_validation_split(windows: &[Window], validation_split: f64) -> (&[Window], &[Window]) {
    let n = windows.len();
    let split = validation_split.clamp(0.0, 1.0);
    let train_size = ((n as f64 * (1.0 - split)).floor() as usize).clamp(n.min(1), n);
    windows.split_at(train_size)
}

/// Stack windows into X [samples, lookback, 1] and y [samples, 1]
pub fn windows_to_arrays(windows: &[Window]) -> (Array3<f64>, Array2<f64>) {
    let lookback = windows.first().map(|w| w.context.len()).unwrap_or(0);
    let mut x = Array3::zeros((windows.len(), lookback, 1));
    let mut y = Array2::zeros((windows.len(), 1));

    for (i, window) in windows.iter().enumerate() {
        for (t, &value) in window.context.iter().enumerate() {
            x[[i, t, 0]] = value;
        }
        y[[i, 0]] = window.target;
    }

    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 / n as f64).collect()
    }

    #[test]
    fn test_window_count() {
        let data = series(100);
        let windows = make_windows(&data, 10).unwrap();

        assert_eq!(windows.len(), 90);
        assert!(windows.iter().all(|w| w.context.len() == 10));
        assert_eq!(windows[0].context[0], data[0]);
        assert_eq!(windows[0].target, data[10]);
        assert_eq!(windows[89].target, data[99]);
    }

    #[test]
    fn test_too_short() {
        let err = make_windows(&series(10), 10).unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientData {
                required: 11,
                actual: 10
            }
        );
    }

    #[test]
    fn test_validation_split() {
        let windows = make_windows(&series(100), 10).unwrap();
        let (train, val) = train_validation_split(&windows, 0.1);
        assert_eq!(train.len(), 81);
        assert_eq!(val.len(), 9);
        assert_eq!(val[0], windows[81]);

        let (train, val) = train_validation_split(&windows[..1], 0.5);
        assert_eq!(train.len(), 1);
        assert!(val.is_empty());
    }

    #[test]
    fn test_to_arrays() {
        let windows = make_windows(&series(20), 5).unwrap();
        let (x, y) = windows_to_arrays(&windows);
        assert_eq!(x.shape(), &[15, 5, 1]);
        assert_eq!(y.shape(), &[15, 1]);
        assert_eq!(y[[0, 0]], windows[0].target);
    }
}
