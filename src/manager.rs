//! Registry of named forecast models
//!
//! `ModelManager` is a cheap, cloneable handle. Each name maps to at most one
//! [`ForecastModel`]; models under different names train independently,
//! while a second training request for a name that is already training is
//! rejected with [`ForecastError::ModelBusy`].

use crate::config::EngineConfig;
use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::model::{
    fit_model, CancelToken, ForecastModel, Hyperparameters, ModelKind, ModelState, Prediction,
    PredictionSet, TrainedModel, TrainingReport,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct ManagerInner {
    models: RwLock<HashMap<String, Arc<ForecastModel>>>,
    defaults: Hyperparameters,
}

/// Named model registry
#[derive(Debug, Clone, Default)]
pub struct ModelManager {
    inner: Arc<ManagerInner>,
}

impl ModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager whose default hyperparameters come from `config`
    pub fn with_config(config: &EngineConfig) -> Self {
        Self::with_hyperparameters(Hyperparameters::from(&config.training))
    }

    pub fn with_hyperparameters(defaults: Hyperparameters) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                models: RwLock::new(HashMap::new()),
                defaults,
            }),
        }
    }

    /// Hyperparameters configured for this manager
    pub fn default_hyperparameters(&self) -> &Hyperparameters {
        &self.inner.defaults
    }

    /// Start training `name` on a blocking worker of the current tokio runtime
    ///
    /// The model is marked `Training` before this returns, so a concurrent
    /// request for the same name fails immediately instead of queueing.
    pub fn spawn_training(
        &self,
        name: &str,
        kind: ModelKind,
        series: TimeSeries,
        hp: Hyperparameters,
    ) -> Result<TrainingHandle> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ForecastError::Training(format!("no async runtime to train on: {}", e))
        })?;
        let model = self.reserve(name, kind)?;
        let cancel = CancelToken::new();
        let token = cancel.clone();

        tracing::info!(
            "Training model '{}' ({}) on {} bars",
            name,
            kind,
            series.len()
        );

        // a task dropped before it runs still releases the model
        let run = InFlight { model: Some(model) };
        let join = runtime.spawn_blocking(move || {
            let outcome = fit_model(kind, &series, &hp, &token);
            run.complete(outcome)
        });

        Ok(TrainingHandle {
            name: name.to_string(),
            cancel,
            join,
        })
    }

    /// Train `name` and wait for the result without blocking the runtime
    pub async fn train(
        &self,
        name: &str,
        kind: ModelKind,
        series: TimeSeries,
        hp: Hyperparameters,
    ) -> Result<TrainingReport> {
        self.spawn_training(name, kind, series, hp)?.wait().await
    }

    /// [`spawn_training`](Self::spawn_training) with this manager's default hyperparameters
    pub fn spawn_training_with_defaults(
        &self,
        name: &str,
        kind: ModelKind,
        series: TimeSeries,
    ) -> Result<TrainingHandle> {
        self.spawn_training(name, kind, series, self.inner.defaults.clone())
    }

    /// [`train`](Self::train) with this manager's default hyperparameters
    pub async fn train_with_defaults(
        &self,
        name: &str,
        kind: ModelKind,
        series: TimeSeries,
    ) -> Result<TrainingReport> {
        self.spawn_training_with_defaults(name, kind, series)?
            .wait()
            .await
    }

    /// [`train_blocking`](Self::train_blocking) with this manager's default hyperparameters
    pub fn train_blocking_with_defaults(
        &self,
        name: &str,
        kind: ModelKind,
        series: &TimeSeries,
    ) -> Result<TrainingReport> {
        self.train_blocking(name, kind, series, &self.inner.defaults)
    }

    /// Train `name` on the calling thread
    pub fn train_blocking(
        &self,
        name: &str,
        kind: ModelKind,
        series: &TimeSeries,
        hp: &Hyperparameters,
    ) -> Result<TrainingReport> {
        let model = self.reserve(name, kind)?;
        tracing::info!(
            "Training model '{}' ({}) on {} bars",
            name,
            kind,
            series.len()
        );
        let run = InFlight { model: Some(model) };
        run.complete(fit_model(kind, series, hp, &CancelToken::new()))
    }

    /// Forecast `horizon` days with the model trained under `name`
    pub fn predict(&self, name: &str, horizon: usize) -> Result<Vec<Prediction>> {
        let model = self
            .model(name)
            .ok_or_else(|| ForecastError::UnknownModel(name.to_string()))?;
        let predictions = model.predict(horizon)?;
        tracing::info!("Model '{}' produced {} predictions", name, predictions.len());
        Ok(predictions)
    }

    /// Like [`predict`](Self::predict), with provenance attached
    pub fn forecast(&self, name: &str, horizon: usize) -> Result<PredictionSet> {
        let model = self
            .model(name)
            .ok_or_else(|| ForecastError::UnknownModel(name.to_string()))?;
        let predictions = self.predict(name, horizon)?;

        Ok(PredictionSet {
            model_name: name.to_string(),
            kind: model.kind(),
            horizon,
            generated_at: Utc::now(),
            predictions,
        })
    }

    pub fn model(&self, name: &str) -> Option<Arc<ForecastModel>> {
        self.inner
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn status(&self, name: &str) -> Option<ModelState> {
        self.model(name).map(|m| m.state())
    }

    /// (name, state) of every model, sorted by name
    pub fn statuses(&self) -> Vec<(String, ModelState)> {
        let models = self
            .inner
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut statuses: Vec<_> = models
            .iter()
            .map(|(name, model)| (name.clone(), model.state()))
            .collect();
        statuses.sort_by(|a, b| a.0.cmp(&b.0));
        statuses
    }

    pub fn names(&self) -> Vec<String> {
        self.statuses().into_iter().map(|(name, _)| name).collect()
    }

    /// Drop an idle model; returns whether one was registered
    pub fn remove(&self, name: &str) -> Result<bool> {
        let mut models = self
            .inner
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match models.get(name) {
            Some(model) if model.state() == ModelState::Training => {
                Err(ForecastError::ModelBusy(name.to_string()))
            }
            Some(_) => {
                models.remove(name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Create or replace the slot for `name` and move it to `Training`
    fn reserve(&self, name: &str, kind: ModelKind) -> Result<Arc<ForecastModel>> {
        let mut models = self
            .inner
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let model = match models.get(name).cloned() {
            Some(existing) if existing.kind() == kind => existing,
            Some(existing) if existing.state() == ModelState::Training => {
                return Err(ForecastError::ModelBusy(name.to_string()));
            }
            _ => {
                let fresh = Arc::new(ForecastModel::new(name, kind));
                models.insert(name.to_string(), Arc::clone(&fresh));
                fresh
            }
        };

        model.begin_training()?;
        Ok(model)
    }
}

/// A model in `Training` that must leave that state exactly once
struct InFlight {
    model: Option<Arc<ForecastModel>>,
}

impl InFlight {
    fn complete(mut self, outcome: Result<TrainedModel>) -> Result<TrainingReport> {
        let model = match self.model.take() {
            Some(model) => model,
            None => return Err(ForecastError::Training("training already completed".into())),
        };

        let result = model.finish_training(outcome);
        match &result {
            Ok(report) => tracing::info!(
                "Model '{}' trained: {} epochs, loss = {:.6}",
                model.name(),
                report.epochs,
                report.loss
            ),
            Err(ForecastError::Cancelled) => {
                tracing::warn!("Training of model '{}' was cancelled", model.name())
            }
            Err(e) => tracing::warn!("Training of model '{}' failed: {}", model.name(), e),
        }
        result
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        // reached when the fit panicked or its task never ran
        if let Some(model) = self.model.take() {
            tracing::warn!("Training of model '{}' aborted", model.name());
            let _ = model.finish_training(Err(ForecastError::Training(
                "training task aborted".into(),
            )));
        }
    }
}

/// Handle to a training run started by [`ModelManager::spawn_training`]
#[derive(Debug)]
pub struct TrainingHandle {
    name: String,
    cancel: CancelToken,
    join: JoinHandle<Result<TrainingReport>>,
}

impl TrainingHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the run to stop; the model ends up `Failed(Cancelled)`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to end
    pub async fn wait(self) -> Result<TrainingReport> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(ForecastError::Training(format!(
                "training task for '{}' failed: {}",
                self.name, e
            ))),
        }
    }
}
