//! Forecast model lifecycle
//!
//! A [`ForecastModel`] moves through `Untrained -> Training -> {Trained | Failed}`.
//! Fitting happens outside the lock; on success the trained parameters are
//! published as one immutable [`TrainedModel`] snapshot, so readers either
//! see the old model or the new one, never a mixture.

use super::arima::ArimaForecaster;
use super::config::Hyperparameters;
use super::neural::NeuralForecaster;
use super::types::{
    confidence_for_day, FailureReason, ModelKind, ModelState, Prediction, TrainingReport,
};
use crate::data::TimeSeries;
use crate::defaults::MIN_PREDICTED_PRICE;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Produces raw price forecasts from a fitted model
pub trait Forecaster: Send + Sync + fmt::Debug {
    /// Forecast `horizon` consecutive values past the training series
    fn forecast(&self, horizon: usize) -> Vec<f64>;
}

/// Cooperative cancellation flag shared with a running fit
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Immutable result of one successful training run
#[derive(Debug)]
pub struct TrainedModel {
    pub kind: ModelKind,
    pub report: TrainingReport,
    /// Date of the last bar trained on; forecasts start the day after
    pub last_date: NaiveDate,
    forecaster: Box<dyn Forecaster>,
}

impl TrainedModel {
    /// Forecast `horizon` days with decaying confidence
    pub fn predict(&self, horizon: usize) -> Vec<Prediction> {
        self.forecaster
            .forecast(horizon)
            .into_iter()
            .enumerate()
            .map(|(i, value)| Prediction {
                date: self.last_date + Duration::days(i as i64 + 1),
                predicted: clamp_price(value),
                confidence: confidence_for_day(i),
            })
            .collect()
    }
}

/// Keep forecasts strictly positive
fn clamp_price(value: f64) -> f64 {
    if value.is_nan() {
        MIN_PREDICTED_PRICE
    } else {
        value.max(MIN_PREDICTED_PRICE)
    }
}

/// Fit a model of `kind` on the closing prices of `series`
pub fn fit_model(
    kind: ModelKind,
    series: &TimeSeries,
    hp: &Hyperparameters,
    cancel: &CancelToken,
) -> Result<TrainedModel> {
    hp.validate()?;
    if cancel.is_cancelled() {
        return Err(ForecastError::Cancelled);
    }

    let closes = series.closes();
    let last_date = series
        .last_date()
        .ok_or_else(|| ForecastError::Data("empty price series".into()))?;

    let (forecaster, report): (Box<dyn Forecaster>, TrainingReport) = match kind {
        ModelKind::Arima => {
            let forecaster = ArimaForecaster::fit(&closes, hp.arima_order)?;
            let report = TrainingReport {
                kind,
                trained_on: closes.len(),
                epochs: 1,
                loss: forecaster.model().sigma2,
                val_loss: None,
                loss_history: vec![forecaster.model().sigma2],
                lookback: None,
                arima: Some(forecaster.model().diagnostics()),
            };
            (Box::new(forecaster), report)
        }
        _ => {
            let (forecaster, summary) = NeuralForecaster::fit(kind, &closes, hp, cancel)?;
            let report = TrainingReport {
                kind,
                trained_on: closes.len(),
                epochs: summary.epochs_run,
                loss: summary.final_loss,
                val_loss: summary.validation_loss,
                loss_history: summary.loss_history,
                lookback: Some(hp.lookback),
                arima: None,
            };
            (Box::new(forecaster), report)
        }
    };

    Ok(TrainedModel {
        kind,
        report,
        last_date,
        forecaster,
    })
}

#[derive(Debug)]
struct ModelInner {
    state: ModelState,
    snapshot: Option<Arc<TrainedModel>>,
}

/// Named model slot with its lifecycle state
#[derive(Debug)]
pub struct ForecastModel {
    name: String,
    kind: ModelKind,
    inner: RwLock<ModelInner>,
}

impl ForecastModel {
    pub fn new(name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inner: RwLock::new(ModelInner {
                state: ModelState::Untrained,
                snapshot: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn state(&self) -> ModelState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone()
    }

    /// Report of the current trained snapshot
    pub fn report(&self) -> Option<TrainingReport> {
        self.snapshot().map(|s| s.report.clone())
    }

    /// Current trained snapshot, if the model is `Trained`
    pub fn snapshot(&self) -> Option<Arc<TrainedModel>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match inner.state {
            ModelState::Trained => inner.snapshot.clone(),
            _ => None,
        }
    }

    /// Enter `Training`; fails if a run is already in flight
    pub fn begin_training(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.state == ModelState::Training {
            return Err(ForecastError::ModelBusy(self.name.clone()));
        }
        inner.state = ModelState::Training;
        Ok(())
    }

    /// Leave `Training` with the outcome of a fit
    ///
    /// Success publishes the new snapshot; failure clears any previous one so
    /// stale parameters are never served.
    pub fn finish_training(&self, outcome: Result<TrainedModel>) -> Result<TrainingReport> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(trained) => {
                let report = trained.report.clone();
                inner.snapshot = Some(Arc::new(trained));
                inner.state = ModelState::Trained;
                Ok(report)
            }
            Err(err) => {
                inner.snapshot = None;
                inner.state = ModelState::Failed(match &err {
                    ForecastError::Cancelled => FailureReason::Cancelled,
                    other => FailureReason::Error(other.to_string()),
                });
                Err(err)
            }
        }
    }

    /// Run a complete training cycle on the calling thread
    pub fn train(
        &self,
        series: &TimeSeries,
        hp: &Hyperparameters,
        cancel: &CancelToken,
    ) -> Result<TrainingReport> {
        self.begin_training()?;
        self.finish_training(fit_model(self.kind, series, hp, cancel))
    }

    /// Forecast `horizon` days from the trained snapshot
    ///
    /// Never blocks on a running fit: a model in `Training` reports busy.
    pub fn predict(&self, horizon: usize) -> Result<Vec<Prediction>> {
        let snapshot = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            match (&inner.state, &inner.snapshot) {
                (ModelState::Training, _) => {
                    return Err(ForecastError::ModelBusy(self.name.clone()))
                }
                (ModelState::Trained, Some(snapshot)) => Arc::clone(snapshot),
                (state, _) => {
                    return Err(ForecastError::ModelNotReady {
                        name: self.name.clone(),
                        state: state.to_string(),
                    })
                }
            }
        };

        Ok(snapshot.predict(horizon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closes(n: usize) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let values: Vec<f64> = (0..n)
            .map(|i| 100.0 + i as f64 * 0.3 + (i as f64 * 0.7).sin())
            .collect();
        TimeSeries::from_closes(start, &values).unwrap()
    }

    #[derive(Debug)]
    struct Fixed(Vec<f64>);

    impl Forecaster for Fixed {
        fn forecast(&self, horizon: usize) -> Vec<f64> {
            self.0.iter().copied().cycle().take(horizon).collect()
        }
    }

    fn fixed_model(values: Vec<f64>) -> TrainedModel {
        TrainedModel {
            kind: ModelKind::Arima,
            report: TrainingReport {
                kind: ModelKind::Arima,
                trained_on: 0,
                epochs: 1,
                loss: 0.0,
                val_loss: None,
                loss_history: vec![],
                lookback: None,
                arima: None,
            },
            last_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            forecaster: Box::new(Fixed(values)),
        }
    }

    #[test]
    fn test_prediction_dates_and_clamping() {
        let predictions = fixed_model(vec![10.0, -3.0]).predict(3);

        assert_eq!(predictions[0].date, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(predictions[2].date, NaiveDate::from_ymd_opt(2024, 4, 3).unwrap());
        assert_eq!(predictions[1].predicted, MIN_PREDICTED_PRICE);
        assert!(predictions[0].confidence > predictions[1].confidence);
    }

    #[test]
    fn test_lifecycle() {
        let model = ForecastModel::new("arima", ModelKind::Arima);
        assert_eq!(model.state(), ModelState::Untrained);
        assert!(matches!(
            model.predict(3),
            Err(ForecastError::ModelNotReady { .. })
        ));

        model.begin_training().unwrap();
        assert_eq!(
            model.begin_training().unwrap_err(),
            ForecastError::ModelBusy("arima".into())
        );
        assert_eq!(
            model.predict(3).unwrap_err(),
            ForecastError::ModelBusy("arima".into())
        );

        model.finish_training(Ok(fixed_model(vec![5.0]))).unwrap();
        assert_eq!(model.state(), ModelState::Trained);
        assert_eq!(model.predict(2).unwrap().len(), 2);
    }

    #[test]
    fn test_failed_retrain_drops_snapshot() {
        let model = ForecastModel::new("arima", ModelKind::Arima);
        model.begin_training().unwrap();
        model.finish_training(Ok(fixed_model(vec![5.0]))).unwrap();

        model.begin_training().unwrap();
        let err = model
            .finish_training(Err(ForecastError::Cancelled))
            .unwrap_err();
        assert_eq!(err, ForecastError::Cancelled);
        assert_eq!(model.state(), ModelState::Failed(FailureReason::Cancelled));
        assert!(model.snapshot().is_none());
        assert!(matches!(
            model.predict(1),
            Err(ForecastError::ModelNotReady { .. })
        ));
    }

    #[test]
    fn test_train_arima() {
        let model = ForecastModel::new("arima", ModelKind::Arima);
        let report = model
            .train(&closes(60), &Hyperparameters::default(), &CancelToken::new())
            .unwrap();

        assert_eq!(report.trained_on, 60);
        assert!(report.arima.is_some());
        let predictions = model.predict(7).unwrap();
        assert_eq!(predictions.len(), 7);
        assert!(predictions.iter().all(|p| p.predicted > 0.0));
    }

    #[test]
    fn test_insufficient_data_fails_model() {
        let model = ForecastModel::new("lstm", ModelKind::Lstm);
        let err = model
            .train(&closes(40), &Hyperparameters::default(), &CancelToken::new())
            .unwrap_err();

        assert_eq!(err.required_minimum(), Some(70));
        assert!(matches!(model.state(), ModelState::Failed(FailureReason::Error(_))));
    }
}
