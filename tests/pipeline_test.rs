//! End-to-end pipeline tests: CSV load, training, persistence, forecasting.

use aircast::core::WindowedFeatureBuilder;
use aircast::model::{forecast, train_best, ForecastError, ModelRegistry, TrainConfig};
use aircast::reading::{load_csv, Reading, ReadingStore, Source};
use chrono::NaiveDate;
use std::io::Write;

fn write_series_csv(path: &std::path::Path, days: usize) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "timestamp,value").unwrap();
    let base = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
    for i in 0..days {
        let date = base + chrono::Duration::days(i as i64);
        let value = 25.0
            + 4.0 * (2.0 * std::f64::consts::PI * i as f64 / 7.0).sin()
            + 0.01 * i as f64;
        writeln!(file, "{} 06:00:00,{:.4}", date.format("%Y-%m-%d"), value).unwrap();
    }
}

#[test]
fn test_csv_to_saved_artifact_to_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("ground.csv");
    let models_dir = dir.path().join("models");
    write_series_csv(&csv_path, 120);

    // Train from the CSV and persist the winner
    let readings = load_csv(&csv_path, Source::Ground).unwrap();
    assert_eq!(readings.len(), 120);

    let outcome = train_best(Source::Ground, &readings, &TrainConfig::default()).unwrap();
    assert_eq!(outcome.artifact.training_samples, 120 - 13);
    outcome.artifact.save(&models_dir).unwrap();

    // A fresh process: open the registry off disk and forecast
    let registry = ModelRegistry::open(&models_dir);
    let store = ReadingStore::new();
    store.insert_many(readings);

    let result = forecast(&registry, &store, Source::Ground).unwrap();
    assert!(result.prediction.is_finite());
    assert!((0.0..=1.0).contains(&result.confidence));
    // Series lives around 25 +/- 5
    assert!(
        result.prediction > 15.0 && result.prediction < 35.0,
        "prediction {}",
        result.prediction
    );
}

#[test]
fn test_forecast_matches_training_feature_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("satellite.csv");
    write_series_csv(&csv_path, 90);

    let readings = load_csv(&csv_path, Source::Satellite).unwrap();
    let outcome = train_best(Source::Satellite, &readings, &TrainConfig::default()).unwrap();
    let artifact = outcome.artifact;

    // Serving produces exactly what a direct pass through the builder,
    // scaler, and regressor produces.
    let models_dir = dir.path().join("models");
    artifact.save(&models_dir).unwrap();

    let registry = ModelRegistry::open(&models_dir);
    let store = ReadingStore::new();
    store.insert_many(readings.clone());
    let served = forecast(&registry, &store, Source::Satellite).unwrap();

    let builder = WindowedFeatureBuilder::new(artifact.window_size, artifact.horizon);
    let vector = builder.build_inference_vector(&readings).unwrap();
    let scaled = artifact.scaler.transform(&vector).unwrap();
    let direct = artifact.regressor.predict_one(&scaled).unwrap();

    assert_eq!(served.prediction, direct);
}

#[test]
fn test_sources_do_not_share_models() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("ground.csv");
    let models_dir = dir.path().join("models");
    write_series_csv(&csv_path, 60);

    let readings = load_csv(&csv_path, Source::Ground).unwrap();
    let outcome = train_best(Source::Ground, &readings, &TrainConfig::default()).unwrap();
    outcome.artifact.save(&models_dir).unwrap();

    let registry = ModelRegistry::open(&models_dir);
    let store = ReadingStore::new();
    store.insert_many(readings);

    // The ground model never answers for the satellite series
    let err = forecast(&registry, &store, Source::Satellite).unwrap_err();
    assert!(matches!(err, ForecastError::NoModel(Source::Satellite)));
}

#[test]
fn test_late_readings_shift_the_forecast_window() {
    let dir = tempfile::tempdir().unwrap();
    let models_dir = dir.path().join("models");

    let base = NaiveDate::from_ymd_opt(2024, 2, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    let series: Vec<Reading> = (0..80)
        .map(|i| {
            let value = 18.0 + 3.0 * (2.0 * std::f64::consts::PI * i as f64 / 7.0).cos();
            Reading::new(Source::Ground, value, base + chrono::Duration::days(i))
        })
        .collect();

    let outcome = train_best(Source::Ground, &series, &TrainConfig::default()).unwrap();
    outcome.artifact.save(&models_dir).unwrap();

    let registry = ModelRegistry::open(&models_dir);
    let store = ReadingStore::new();
    store.insert_many(series.clone());

    let before = forecast(&registry, &store, Source::Ground).unwrap();

    // Appending a burst of much higher readings moves the trailing window
    store.insert_many((0..7).map(|i| {
        Reading::new(
            Source::Ground,
            60.0,
            base + chrono::Duration::days(80 + i),
        )
    }));
    let after = forecast(&registry, &store, Source::Ground).unwrap();

    assert_ne!(before.prediction, after.prediction);
}
