//! Integration tests for the prediction HTTP server

use aircast::reading::{Reading, ReadingStore, Source};
use aircast::server::{run, ServerConfig};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

async fn start_server(
    models_dir: std::path::PathBuf,
    store: Arc<ReadingStore>,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let config = ServerConfig::new(0, models_dir);
    let handles = run(config, store).await.expect("Failed to start server");

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    handles
}

fn daily_readings(source: Source, days: usize) -> Vec<Reading> {
    let base = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    (0..days)
        .map(|i| {
            Reading::new(
                source,
                10.0 + i as f64,
                base + chrono::Duration::days(i as i64),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_health_endpoint() {
    let models_dir = tempfile::tempdir().unwrap();
    let (addr, shutdown_tx) =
        start_server(models_dir.path().to_path_buf(), Arc::new(ReadingStore::new())).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert!(body["version"].as_str().is_some());

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_predictions_without_models() {
    let models_dir = tempfile::tempdir().unwrap();
    let (addr, shutdown_tx) =
        start_server(models_dir.path().to_path_buf(), Arc::new(ReadingStore::new())).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/api/predictions", addr))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let predictions = body["predictions"].as_array().expect("predictions array");
    assert_eq!(predictions.len(), 2);
    for entry in predictions {
        assert_eq!(entry["status"], "no_model");
        assert!(entry.get("prediction").is_none());
    }

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_ingest_and_data_points() {
    let models_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ReadingStore::new());
    let (addr, shutdown_tx) = start_server(models_dir.path().to_path_buf(), store).await;

    let client = reqwest::Client::new();

    let payload = serde_json::json!({
        "readings": [
            { "source": "ground", "value": 12.5, "timestamp": "2024-05-01T08:00:00" },
            { "source": "ground", "value": 13.0, "timestamp": "2024-05-02T08:00:00" },
            { "source": "satellite", "value": 9.0, "timestamp": "2024-05-01T08:00:00" }
        ]
    });
    let response = client
        .post(format!("http://{}/api/readings", addr))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["ingested"], 3);

    // Newest first, limited to the requested source
    let response = client
        .get(format!(
            "http://{}/api/data-points?source=ground&limit=10",
            addr
        ))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["source"], "ground");
    assert_eq!(body["count"], 2);
    let readings = body["readings"].as_array().unwrap();
    assert_eq!(readings[0]["value"], 13.0);
    assert_eq!(readings[1]["value"], 12.5);

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_data_points_rejects_unknown_source() {
    let models_dir = tempfile::tempdir().unwrap();
    let (addr, shutdown_tx) =
        start_server(models_dir.path().to_path_buf(), Arc::new(ReadingStore::new())).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/api/data-points?source=orbital", addr))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["code"], "INVALID_SOURCE");

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_models_endpoint_reports_availability() {
    let models_dir = tempfile::tempdir().unwrap();
    let (addr, shutdown_tx) =
        start_server(models_dir.path().to_path_buf(), Arc::new(ReadingStore::new())).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/api/models", addr))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["features"], 16);
    let models = body["models"].as_array().expect("models array");
    assert_eq!(models.len(), 2);
    assert!(models.iter().all(|m| m["available"] == false));

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_predict_custom_without_models() {
    let models_dir = tempfile::tempdir().unwrap();
    let (addr, shutdown_tx) =
        start_server(models_dir.path().to_path_buf(), Arc::new(ReadingStore::new())).await;

    let client = reqwest::Client::new();
    let payload = serde_json::json!({
        "so2_mean": 12.0, "so2_std": 1.5, "so2_min": 10.0, "so2_max": 14.0,
        "so2_median": 12.0, "year": 2024.0, "month": 5.0, "day": 7.0,
        "day_of_week": 1.0, "hour": 8.0
    });
    let response = client
        .post(format!("http://{}/api/predict", addr))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["code"], "NO_MODELS");

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_served_forecast_with_trained_model() {
    use aircast::model::{train_best, TrainConfig};

    let models_dir = tempfile::tempdir().unwrap();

    // Train and persist a ground model, then serve from a store holding the
    // same series.
    let series = daily_readings(Source::Ground, 60);
    let outcome = train_best(Source::Ground, &series, &TrainConfig::default()).unwrap();
    outcome.artifact.save(models_dir.path()).unwrap();

    let store = Arc::new(ReadingStore::new());
    store.insert_many(series);
    let (addr, shutdown_tx) = start_server(models_dir.path().to_path_buf(), store).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/api/predictions", addr))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let predictions = body["predictions"].as_array().unwrap();

    let ground = predictions
        .iter()
        .find(|p| p["source"] == "ground")
        .expect("ground entry");
    assert_eq!(ground["status"], "ok");
    assert!(ground["prediction"].as_f64().unwrap().is_finite());
    assert_eq!(ground["horizon"], 7);

    let satellite = predictions
        .iter()
        .find(|p| p["source"] == "satellite")
        .expect("satellite entry");
    assert_eq!(satellite["status"], "no_model");

    // Custom prediction now has a model to run against
    let payload = serde_json::json!({
        "so2_mean": 40.0, "so2_std": 2.0, "so2_min": 37.0, "so2_max": 43.0,
        "so2_median": 40.0, "year": 2024.0, "month": 6.0, "day": 29.0,
        "day_of_week": 5.0, "hour": 8.0
    });
    let response = client
        .post(format!("http://{}/api/predict", addr))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let custom = body["predictions"].as_array().unwrap();
    assert_eq!(custom.len(), 1);
    assert_eq!(custom[0]["source"], "ground");
    assert!(custom[0]["prediction"].as_f64().unwrap().is_finite());

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_reload_picks_up_new_model() {
    use aircast::model::{train_best, TrainConfig};

    let models_dir = tempfile::tempdir().unwrap();
    let (addr, shutdown_tx) =
        start_server(models_dir.path().to_path_buf(), Arc::new(ReadingStore::new())).await;

    let client = reqwest::Client::new();

    // Nothing loaded yet
    let response = client
        .post(format!("http://{}/api/models/reload", addr))
        .send()
        .await
        .expect("Failed to send request");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["loaded"], 0);

    // Drop a new artifact into the directory and reload
    let series = daily_readings(Source::Satellite, 60);
    let outcome = train_best(Source::Satellite, &series, &TrainConfig::default()).unwrap();
    outcome.artifact.save(models_dir.path()).unwrap();

    let response = client
        .post(format!("http://{}/api/models/reload", addr))
        .send()
        .await
        .expect("Failed to send request");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["loaded"], 1);

    let response = client
        .get(format!("http://{}/api/models", addr))
        .send()
        .await
        .expect("Failed to send request");
    let body: serde_json::Value = response.json().await.unwrap();
    let satellite = body["models"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["source"] == "satellite")
        .unwrap()
        .clone();
    assert_eq!(satellite["available"], true);
    assert!(satellite["model"].as_str().is_some());

    let _ = shutdown_tx.send(());
}
