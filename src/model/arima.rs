//! ARIMA model for price series
//!
//! The series is differenced `d` times, an ARMA(p, q) model is fitted to the
//! differenced series and forecasts are integrated back to price levels.
//!
//! Estimation:
//! - p = q = 0: constant mean of the differenced series
//! - q = 0: ordinary least squares on lagged values
//! - q > 0: Hannan-Rissanen two-step regression (a long AR fit supplies
//!   residual estimates that enter the second regression as MA regressors)

use super::config::ArimaOrder;
use super::forecast::Forecaster;
use super::types::ArimaDiagnostics;
use crate::defaults::MIN_ARIMA_OBSERVATIONS;
use crate::error::{ForecastError, Result};
use nalgebra::{DMatrix, DVector};

/// Fitted ARIMA(p, d, q) model
#[derive(Debug, Clone)]
pub struct ArimaModel {
    pub order: ArimaOrder,
    /// AR coefficients (φ)
    pub ar_coeffs: Vec<f64>,
    /// MA coefficients (θ)
    pub ma_coeffs: Vec<f64>,
    /// Constant (c)
    pub constant: f64,
    /// One-step residuals over the differenced training series
    pub residuals: Vec<f64>,
    /// Residual variance
    pub sigma2: f64,
    pub aic: f64,
    pub bic: f64,
}

impl ArimaModel {
    /// Fit the model on raw prices
    ///
    /// Any order needs at least 30 observations; orders too large for the
    /// data that clears that bar fail the fit with a `Training` error.
    pub fn fit(data: &[f64], order: ArimaOrder) -> Result<Self> {
        if data.len() < MIN_ARIMA_OBSERVATIONS {
            return Err(ForecastError::InsufficientData {
                required: MIN_ARIMA_OBSERVATIONS,
                actual: data.len(),
            });
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Data("series contains non-finite values".into()));
        }

        let ArimaOrder { p, d, q } = order;
        let diff = difference(data, d);
        if diff.len() <= p + q {
            return Err(ForecastError::Training(format!(
                "{} leaves {} points after differencing",
                order,
                diff.len()
            )));
        }

        let (constant, ar_coeffs, ma_coeffs) = match (p, q) {
            (0, 0) => (mean(&diff), vec![], vec![]),
            (_, 0) => {
                let (constant, ar) = estimate_ar(&diff, p)?;
                (constant, ar, vec![])
            }
            _ => estimate_arma(&diff, p, q)?,
        };

        let residuals = conditional_residuals(&diff, constant, &ar_coeffs, &ma_coeffs);
        let fitted = &residuals[p.min(residuals.len())..];
        let n = fitted.len() as f64;
        let sigma2 = fitted.iter().map(|r| r * r).sum::<f64>() / n;
        if !sigma2.is_finite() {
            return Err(ForecastError::Training(format!(
                "{} residuals diverged",
                order
            )));
        }

        // Gaussian log-likelihood; a perfect fit gets a tiny variance floor
        let k = (p + q + 1) as f64;
        let log_likelihood =
            -0.5 * n * (1.0 + (2.0 * std::f64::consts::PI * sigma2.max(1e-12)).ln());
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * n.ln();

        tracing::debug!(
            "{} fitted: c = {:.6}, phi = {:?}, theta = {:?}, sigma2 = {:.6}",
            order,
            constant,
            ar_coeffs,
            ma_coeffs,
            sigma2
        );

        Ok(Self {
            order,
            ar_coeffs,
            ma_coeffs,
            constant,
            residuals,
            sigma2,
            aic,
            bic,
        })
    }

    /// Forecast `h` steps past the end of `data` (the training series)
    pub fn forecast(&self, data: &[f64], h: usize) -> Vec<f64> {
        let mut extended = difference(data, self.order.d);
        let mut residuals = self.residuals.clone();
        let mut forecasts = Vec::with_capacity(h);

        for _ in 0..h {
            let ar: f64 = self
                .ar_coeffs
                .iter()
                .enumerate()
                .map(|(i, phi)| phi * lag(&extended, i + 1))
                .sum();
            let ma: f64 = self
                .ma_coeffs
                .iter()
                .enumerate()
                .map(|(j, theta)| theta * lag(&residuals, j + 1))
                .sum();
            let next = self.constant + ar + ma;

            extended.push(next);
            // expected future shock
            residuals.push(0.0);
            forecasts.push(next);
        }

        undifference(&forecasts, data, self.order.d)
    }

    pub fn diagnostics(&self) -> ArimaDiagnostics {
        ArimaDiagnostics {
            order: self.order,
            ar_coeffs: self.ar_coeffs.clone(),
            ma_coeffs: self.ma_coeffs.clone(),
            constant: self.constant,
            sigma2: self.sigma2,
            aic: self.aic,
            bic: self.bic,
        }
    }
}

/// ARIMA model together with the series it forecasts from
#[derive(Debug, Clone)]
pub struct ArimaForecaster {
    model: ArimaModel,
    history: Vec<f64>,
}

impl ArimaForecaster {
    pub fn fit(closes: &[f64], order: ArimaOrder) -> Result<Self> {
        Ok(Self {
            model: ArimaModel::fit(closes, order)?,
            history: closes.to_vec(),
        })
    }

    pub fn model(&self) -> &ArimaModel {
        &self.model
    }
}

impl Forecaster for ArimaForecaster {
    fn forecast(&self, horizon: usize) -> Vec<f64> {
        self.model.forecast(&self.history, horizon)
    }
}

/// Difference a series `d` times
pub fn difference(data: &[f64], d: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..d {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Integrate forecasts of the d-times differenced series back to levels
///
/// Level k is rebuilt from the last observed value of the k-times
/// differenced training series.
fn undifference(forecasts: &[f64], data: &[f64], d: usize) -> Vec<f64> {
    let mut result = forecasts.to_vec();
    for k in (0..d).rev() {
        let mut level = difference(data, k).last().copied().unwrap_or(0.0);
        for value in result.iter_mut() {
            level += *value;
            *value = level;
        }
    }
    result
}

/// Value `k` steps back from the end, 0 before the start
fn lag(series: &[f64], k: usize) -> f64 {
    series
        .len()
        .checked_sub(k)
        .map(|i| series[i])
        .unwrap_or(0.0)
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        0.0
    } else {
        data.iter().sum::<f64>() / data.len() as f64
    }
}

/// Least-squares β for y ≈ Xβ
///
/// Solved through the SVD of X; singular values below 1e-10 of the largest
/// are dropped, so collinear lags get the minimum-norm solution.
fn ols(rows: usize, cols: usize, x_data: &[f64], y: Vec<f64>) -> Result<DVector<f64>> {
    if rows <= cols {
        return Err(ForecastError::Training(format!(
            "{} observations cannot identify {} parameters",
            rows, cols
        )));
    }

    let x = DMatrix::from_row_slice(rows, cols, x_data);
    let y = DVector::from_vec(y);
    let svd = x.svd(true, true);
    let tolerance = svd.singular_values.max() * 1e-10;

    svd.solve(&y, tolerance)
        .map_err(|e| ForecastError::Training(format!("least squares failed: {}", e)))
}

/// AR(p) by least squares; returns (constant, φ)
fn estimate_ar(data: &[f64], p: usize) -> Result<(f64, Vec<f64>)> {
    let n = data.len();
    let rows = n.saturating_sub(p);

    let mut x_data = Vec::with_capacity(rows * (p + 1));
    for t in p..n {
        x_data.push(1.0);
        for i in 1..=p {
            x_data.push(data[t - i]);
        }
    }

    let beta = ols(rows, p + 1, &x_data, data[p.min(n)..].to_vec())?;
    Ok((beta[0], beta.iter().skip(1).copied().collect()))
}

/// ARMA(p, q) by Hannan-Rissanen; returns (constant, φ, θ)
fn estimate_arma(data: &[f64], p: usize, q: usize) -> Result<(f64, Vec<f64>, Vec<f64>)> {
    let n = data.len();

    // Step 1: long AR for innovation estimates
    let long_order = (p + q).max((n / 4).min(10));
    let (c_long, phi_long) = estimate_ar(data, long_order)?;
    let mut innovations = vec![0.0; n];
    for t in long_order..n {
        let fitted: f64 = phi_long
            .iter()
            .enumerate()
            .map(|(i, phi)| phi * data[t - i - 1])
            .sum();
        innovations[t] = data[t] - c_long - fitted;
    }

    // Step 2: regress on lagged values and lagged innovations
    let start = long_order + q;
    let cols = 1 + p + q;
    let rows = n.saturating_sub(start);
    let mut x_data = Vec::with_capacity(rows * cols);
    for t in start..n {
        x_data.push(1.0);
        for i in 1..=p {
            x_data.push(data[t - i]);
        }
        for j in 1..=q {
            x_data.push(innovations[t - j]);
        }
    }

    let beta = ols(rows, cols, &x_data, data[start.min(n)..].to_vec())?;
    let ar = beta.iter().skip(1).take(p).copied().collect();
    // keep the MA part invertible
    let ma = beta
        .iter()
        .skip(1 + p)
        .take(q)
        .map(|theta| theta.clamp(-0.99, 0.99))
        .collect();

    Ok((beta[0], ar, ma))
}

/// One-step residuals with pre-sample values and shocks set to 0
fn conditional_residuals(data: &[f64], constant: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut residuals = vec![0.0; data.len()];

    for t in p..data.len() {
        let ar_part: f64 = ar.iter().enumerate().map(|(i, phi)| phi * data[t - i - 1]).sum();
        let ma_part: f64 = ma
            .iter()
            .enumerate()
            .filter(|(j, _)| t > *j)
            .map(|(j, theta)| theta * residuals[t - j - 1])
            .sum();
        residuals[t] = data[t] - constant - ar_part - ma_part;
    }

    residuals
}
