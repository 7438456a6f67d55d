//! Integration tests for the forecasting and sentiment engine

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use market_forecast::{
    // Config
    load_config, save_config, EngineConfig,
    // Data
    TextDocument, TimeSeries,
    // Models
    ArimaOrder, ForecastError, ForecastModel, Hyperparameters, ModelKind, ModelManager,
    ModelState,
    // Sentiment
    SentimentAggregator, SentimentLabel, SentimentReport,
};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn uptrend(n: usize) -> TimeSeries {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + i as f64 * 0.8 + (i as f64 * 0.7).sin() * 1.5)
        .collect();
    TimeSeries::from_closes(start(), &closes).unwrap()
}

fn small_network() -> Hyperparameters {
    let mut hp = Hyperparameters::new()
        .with_lookback(60)
        .with_recurrent_units(8)
        .with_epochs(3);
    hp.conv_filters = 8;
    hp
}

mod forecasting {
    use super::*;
    use market_forecast::model::FailureReason;

    #[test]
    fn test_neural_models_forecast_a_week() {
        let series = uptrend(90);
        let last = series.last_date().unwrap();

        for kind in [ModelKind::Lstm, ModelKind::Gru, ModelKind::CnnLstm] {
            let model = ForecastModel::new(kind.default_name(), kind);
            let report = model
                .train(&series, &small_network(), &Default::default())
                .unwrap();
            assert_eq!(report.epochs, 3, "{} should run every epoch", kind);
            assert_eq!(model.state(), ModelState::Trained);

            let predictions = model.predict(7).unwrap();
            assert_eq!(predictions.len(), 7);
            for (i, p) in predictions.iter().enumerate() {
                assert_eq!(p.date, last + Duration::days(i as i64 + 1));
                assert!(p.predicted.is_finite() && p.predicted >= 0.01);
            }
            assert!(predictions
                .windows(2)
                .all(|w| w[1].confidence < w[0].confidence));
        }
    }

    #[test]
    fn test_arima_forecast() {
        let series = uptrend(90);
        let hp = Hyperparameters::new().with_arima_order(ArimaOrder::new(1, 1, 1));
        let model = ForecastModel::new("arima", ModelKind::Arima);
        let report = model.train(&series, &hp, &Default::default()).unwrap();

        let arima = report.arima.expect("ARIMA diagnostics");
        assert_eq!(arima.order, ArimaOrder::new(1, 1, 1));
        assert!(arima.aic.is_finite());

        let predictions = model.predict(5).unwrap();
        // trend continues upward from the last close
        let last_close = *series.closes().last().unwrap();
        assert!(predictions[4].predicted > last_close - 5.0);
        assert_eq!(predictions[0].confidence, 0.9);
    }

    #[test]
    fn test_short_series_fails_training() {
        let model = ForecastModel::new("lstm", ModelKind::Lstm);
        let err = model
            .train(&uptrend(40), &small_network(), &Default::default())
            .unwrap_err();

        assert_eq!(
            err,
            ForecastError::InsufficientData {
                required: 70,
                actual: 40
            }
        );
        assert!(matches!(
            model.state(),
            ModelState::Failed(FailureReason::Error(_))
        ));
        assert!(matches!(
            model.predict(3).unwrap_err(),
            ForecastError::ModelNotReady { .. }
        ));
    }

    #[test]
    fn test_untrained_and_unknown_models() {
        let model = ForecastModel::new("gru", ModelKind::Gru);
        assert_eq!(model.state(), ModelState::Untrained);
        assert!(matches!(
            model.predict(1).unwrap_err(),
            ForecastError::ModelNotReady { .. }
        ));

        let manager = ModelManager::new();
        assert_eq!(
            manager.predict("missing", 1).unwrap_err(),
            ForecastError::UnknownModel("missing".into())
        );
        assert_eq!(manager.status("missing"), None);
    }
}

mod lifecycle {
    use super::*;
    use market_forecast::model::FailureReason;

    fn quick() -> Hyperparameters {
        Hyperparameters::new()
            .with_lookback(10)
            .with_recurrent_units(8)
            .with_epochs(2)
    }

    #[tokio::test]
    async fn test_cancel_then_retrain() {
        let manager = ModelManager::new();
        let series = uptrend(200);

        let handle = manager
            .spawn_training("acme", ModelKind::Lstm, series.clone(), quick().with_epochs(100_000))
            .unwrap();
        assert_eq!(manager.status("acme"), Some(ModelState::Training));
        assert_eq!(
            manager.predict("acme", 1).unwrap_err(),
            ForecastError::ModelBusy("acme".into())
        );
        assert!(matches!(
            manager.spawn_training("acme", ModelKind::Lstm, series.clone(), quick()),
            Err(ForecastError::ModelBusy(_))
        ));

        handle.cancel();
        assert_eq!(handle.wait().await.unwrap_err(), ForecastError::Cancelled);
        assert_eq!(
            manager.status("acme"),
            Some(ModelState::Failed(FailureReason::Cancelled))
        );

        manager
            .train("acme", ModelKind::Lstm, series, quick())
            .await
            .unwrap();
        assert_eq!(manager.status("acme"), Some(ModelState::Trained));
        assert_eq!(manager.predict("acme", 3).unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_training_under_different_names() {
        let manager = ModelManager::new();
        let rising = uptrend(120);
        let closes: Vec<f64> = (0..120).map(|i| 60.0 - i as f64 * 0.3).collect();
        let falling = TimeSeries::from_closes(start(), &closes).unwrap();

        let first = manager
            .spawn_training("rising", ModelKind::Gru, rising, quick().with_epochs(20))
            .unwrap();
        let second = manager
            .spawn_training("falling", ModelKind::Gru, falling, quick().with_epochs(20))
            .unwrap();
        assert_eq!(manager.status("rising"), Some(ModelState::Training));
        assert_eq!(manager.status("falling"), Some(ModelState::Training));

        let (a, b) = tokio::join!(first.wait(), second.wait());
        assert_eq!(a.unwrap().epochs, 20);
        assert_eq!(b.unwrap().epochs, 20);
        assert_eq!(manager.status("rising"), Some(ModelState::Trained));
        assert_eq!(manager.status("falling"), Some(ModelState::Trained));

        let up = manager.predict("rising", 3).unwrap();
        let down = manager.predict("falling", 3).unwrap();
        assert_ne!(up, down);
        assert!(up[0].predicted > down[0].predicted);
    }

    #[test]
    fn test_models_are_independent() {
        let manager = ModelManager::new();
        let series = uptrend(80);
        manager
            .train_blocking("arima", ModelKind::Arima, &series, &quick())
            .unwrap();
        manager
            .train_blocking("gru", ModelKind::Gru, &series, &quick())
            .unwrap();

        assert_eq!(manager.names(), vec!["arima".to_string(), "gru".to_string()]);
        assert_eq!(manager.forecast("arima", 2).unwrap().kind, ModelKind::Arima);
        assert_eq!(manager.remove("gru"), Ok(true));
        assert_eq!(manager.predict("arima", 2).unwrap().len(), 2);
    }
}

mod sentiment {
    use super::*;
    use market_forecast::correlation::{correlate, correlate_series, AlignedPair, PriceChange, SentimentPoint};
    use market_forecast::CorrelationStrength;

    #[test]
    fn test_batch_distribution() {
        let aggregator = SentimentAggregator::new();
        let texts = [
            "Strong buy: record revenue growth and a new partnership",
            "Analysts warn of a recession and a bear market",
            "The board meets on Tuesday",
        ];

        let aggregate = aggregator.aggregate(&texts);
        assert_eq!(aggregate.sample_size, 3);
        assert_eq!(aggregate.distribution.positive, 1);
        assert_eq!(aggregate.distribution.negative, 1);
        assert_eq!(aggregate.distribution.neutral, 1);
        assert_eq!(aggregate.majority_label, SentimentLabel::Neutral);
    }

    #[test]
    fn test_market_slang_batch() {
        let aggregate = SentimentAggregator::new().aggregate(&[
            "bullish breakout incoming",
            "this stock is a total bubble",
            "holding steady today",
        ]);
        assert_eq!(aggregate.distribution.positive, 1);
        assert_eq!(aggregate.distribution.negative, 1);
        assert_eq!(aggregate.distribution.neutral, 1);
    }

    #[test]
    fn test_empty_batch_is_neutral() {
        let aggregate = SentimentAggregator::new().aggregate::<&str>(&[]);
        assert_eq!(aggregate.sample_size, 0);
        assert_eq!(aggregate.label, SentimentLabel::Neutral);
        assert_eq!(aggregate.confidence, 0.0);
    }

    #[test]
    fn test_correlation_with_price_changes() {
        let day = |d: i64| start() + Duration::days(d);
        let sentiment: Vec<_> = (0..6)
            .map(|d| SentimentPoint::new(day(d), -0.5 + d as f64 * 0.2))
            .collect();
        let changes: Vec<_> = (0..6)
            .map(|d| PriceChange::new(day(d), -2.0 + d as f64 * 0.8))
            .collect();

        let result = correlate_series(&sentiment, &changes).unwrap();
        assert!((result.coefficient - 1.0).abs() < 1e-9);
        assert_eq!(result.strength, CorrelationStrength::Strong);

        let single = [AlignedPair {
            date: day(0),
            sentiment: 0.1,
            price_change: 0.5,
        }];
        assert_eq!(
            correlate(&single).unwrap_err(),
            ForecastError::InsufficientSamples {
                required: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_report_over_a_week() {
        let series = uptrend(10);
        let documents: Vec<_> = (0..8)
            .map(|d| {
                let at = Utc.with_ymd_and_hms(2024, 1, 2 + d, 9, 30, 0).unwrap();
                let text = if d % 2 == 0 {
                    "bullish breakout, strong buy"
                } else {
                    "concerns about debt and a possible downturn"
                };
                TextDocument::new(at, text)
            })
            .collect();

        let report = SentimentReport::generate("ACME", &documents, &series);
        assert_eq!(report.overall.sample_size, 8);
        assert_eq!(report.trend.as_ref().map(|t| t.period), Some(7));
        assert!(report.correlation.is_some());
        assert!(report.summary.starts_with("Overall sentiment is"));
    }
}

mod evaluation {
    use market_forecast::evaluation::{evaluate, rank, RankingMetric};
    use std::collections::BTreeMap;

    #[test]
    fn test_evaluate_and_rank() {
        let actual = [100.0, 101.0, 103.0, 102.0, 104.0];
        let mut results = BTreeMap::new();
        results.insert("lstm", evaluate(&[100.5, 101.5, 102.5, 102.5, 103.5], &actual).unwrap());
        results.insert("arima", evaluate(&[99.0, 100.0, 101.0, 104.0, 103.0], &actual).unwrap());

        assert_eq!(results["lstm"].directional_accuracy, 100.0);
        assert!(results["lstm"].rmse < results["arima"].rmse);

        let by_direction = rank(results.iter().map(|(k, v)| (*k, v)), RankingMetric::default());
        assert_eq!(by_direction[0].name, "lstm");
        assert_eq!(by_direction[1].rank, 2);

        let by_rmse = rank(results.iter().map(|(k, v)| (*k, v)), RankingMetric::Rmse);
        assert_eq!(by_rmse[0].name, "lstm");
    }
}

mod configuration {
    use super::*;

    #[test]
    fn test_config_drives_manager_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let mut config = EngineConfig::default();
        config.training.lookback = 20;
        config.training.epochs = 4;
        config.sentiment.extra_terms.insert("squeeze".into(), 4);
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);

        let manager = ModelManager::with_config(&loaded);
        assert_eq!(manager.default_hyperparameters().lookback, 20);
        assert_eq!(manager.default_hyperparameters().epochs, 4);

        let report = manager
            .train_blocking_with_defaults("acme", ModelKind::Gru, &uptrend(40))
            .unwrap();
        assert_eq!(report.epochs, 4);
        assert_eq!(
            manager
                .train_blocking_with_defaults("acme", ModelKind::Gru, &uptrend(25))
                .unwrap_err(),
            ForecastError::InsufficientData {
                required: 30,
                actual: 25
            }
        );
    }
}
