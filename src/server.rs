//! HTTP server exposing forecasts, custom predictions, and data access.
//!
//! This module provides an HTTP server that:
//! - Serves per-source forecasts from the loaded model artifacts
//! - Accepts custom feature payloads for one-off predictions
//! - Exposes recent readings, model metadata, and a reload hook
//!
//! # Architecture
//!
//! ```text
//! clients ──→ GET /api/predictions ──→ registry + store ──→ forecasts
//!         ──→ POST /api/predict    ──→ scaler + regressor per source
//! ```

use crate::core::{FeatureError, FeatureVector, FEATURE_COUNT};
use crate::model::{forecast, ForecastError, ModelRegistry};
use crate::reading::{Reading, ReadingStore, Source};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Directory holding model artifacts
    pub models_dir: PathBuf,
}

impl ServerConfig {
    pub fn new(port: u16, models_dir: PathBuf) -> Self {
        Self { port, models_dir }
    }
}

/// Shared server state
pub struct ServerState {
    registry: ModelRegistry,
    store: Arc<ReadingStore>,
}

impl ServerState {
    pub fn new(config: &ServerConfig, store: Arc<ReadingStore>) -> Self {
        Self {
            registry: ModelRegistry::open(config.models_dir.clone()),
            store,
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn error_reply(status: StatusCode, code: &str, error: impl Into<String>) -> ErrorReply {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// One source's entry in the predictions response. `status` tells the
/// caller whether a prediction is present and, if not, why.
#[derive(Serialize)]
pub struct PredictionEntry {
    pub source: Source,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizon: Option<usize>,
}

#[derive(Serialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<PredictionEntry>,
}

/// GET /api/predictions
///
/// Forecasts for every source. A source with no model or too little data
/// gets an explicit status rather than a fabricated number.
async fn predictions(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<PredictionsResponse>, ErrorReply> {
    let mut entries = Vec::with_capacity(Source::ALL.len());
    for source in Source::ALL {
        let entry = match forecast(&state.registry, &state.store, source) {
            Ok(f) => PredictionEntry {
                source,
                status: "ok".to_string(),
                prediction: Some(f.prediction),
                model: Some(f.model_name),
                confidence: Some(f.confidence),
                horizon: Some(f.horizon),
            },
            Err(ForecastError::NoModel(_)) => PredictionEntry {
                source,
                status: "no_model".to_string(),
                prediction: None,
                model: None,
                confidence: None,
                horizon: None,
            },
            Err(ForecastError::Feature(FeatureError::InsufficientData { .. })) => {
                PredictionEntry {
                    source,
                    status: "insufficient_data".to_string(),
                    prediction: None,
                    model: None,
                    confidence: None,
                    horizon: None,
                }
            }
            Err(e) => {
                tracing::error!(%source, error = %e, "forecast failed");
                return Err(error_reply(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "FORECAST_ERROR",
                    e.to_string(),
                ));
            }
        };
        entries.push(entry);
    }

    Ok(Json(PredictionsResponse { predictions: entries }))
}

/// Custom prediction request: window statistics plus the calendar fields of
/// the window's last reading. Cyclical encodings are derived server-side.
#[derive(Debug, Deserialize)]
pub struct CustomPredictRequest {
    pub so2_mean: f64,
    pub so2_std: f64,
    pub so2_min: f64,
    pub so2_max: f64,
    pub so2_median: f64,
    pub year: f64,
    pub month: f64,
    pub day: f64,
    pub day_of_week: f64,
    pub hour: f64,
}

impl CustomPredictRequest {
    fn to_feature_vector(&self) -> FeatureVector {
        let mut v = [0.0; FEATURE_COUNT];
        v[0] = self.so2_mean;
        v[1] = self.so2_std;
        v[2] = self.so2_min;
        v[3] = self.so2_max;
        v[4] = self.so2_median;
        v[5] = self.year;
        v[6] = self.month;
        v[7] = self.day;
        v[8] = self.day_of_week;
        v[9] = self.hour;
        v[10] = (2.0 * PI * self.month / 12.0).sin();
        v[11] = (2.0 * PI * self.month / 12.0).cos();
        v[12] = (2.0 * PI * self.day / 31.0).sin();
        v[13] = (2.0 * PI * self.day / 31.0).cos();
        v[14] = (2.0 * PI * self.hour / 24.0).sin();
        v[15] = (2.0 * PI * self.hour / 24.0).cos();
        v
    }
}

#[derive(Serialize)]
pub struct CustomPredictionEntry {
    pub source: Source,
    pub prediction: f64,
    pub model: String,
    pub confidence: f64,
}

#[derive(Serialize)]
pub struct CustomPredictResponse {
    pub predictions: Vec<CustomPredictionEntry>,
}

/// POST /api/predict
///
/// Runs the supplied window through every available model. Errors if no
/// model is loaded at all.
async fn predict_custom(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CustomPredictRequest>,
) -> Result<Json<CustomPredictResponse>, ErrorReply> {
    let vector = request.to_feature_vector();

    let mut entries = Vec::new();
    for source in state.registry.available() {
        let artifact = match state.registry.get(source) {
            Some(a) => a,
            None => continue,
        };
        let scaled = artifact.scaler.transform(&vector).map_err(|e| {
            tracing::error!(%source, error = %e, "custom prediction failed");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "MODEL_ERROR", e.to_string())
        })?;
        let prediction = artifact.regressor.predict_one(&scaled).map_err(|e| {
            tracing::error!(%source, error = %e, "custom prediction failed");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "MODEL_ERROR", e.to_string())
        })?;

        entries.push(CustomPredictionEntry {
            source,
            prediction,
            model: artifact.model_name.clone(),
            confidence: artifact.confidence(),
        });
    }

    if entries.is_empty() {
        return Err(error_reply(
            StatusCode::SERVICE_UNAVAILABLE,
            "NO_MODELS",
            "no trained models are loaded",
        ));
    }

    Ok(Json(CustomPredictResponse { predictions: entries }))
}

#[derive(Debug, Deserialize)]
pub struct DataPointsQuery {
    pub source: String,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct DataPointsResponse {
    pub source: Source,
    pub count: usize,
    pub readings: Vec<Reading>,
}

/// GET /api/data-points?source=ground&limit=100
///
/// The most recent readings for a source, newest first.
async fn data_points(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<DataPointsQuery>,
) -> Result<Json<DataPointsResponse>, ErrorReply> {
    let source: Source = query.source.parse().map_err(|e: crate::reading::ParseSourceError| {
        error_reply(StatusCode::BAD_REQUEST, "INVALID_SOURCE", e.to_string())
    })?;
    let limit = query.limit.unwrap_or(100);

    let mut readings = state.store.recent(source, limit);
    readings.reverse();

    Ok(Json(DataPointsResponse {
        source,
        count: readings.len(),
        readings,
    }))
}

#[derive(Serialize)]
pub struct ModelInfo {
    pub source: Source,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_samples: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mae: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r2: Option<f64>,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub features: usize,
    pub models: Vec<ModelInfo>,
}

/// GET /api/models
async fn models(State(state): State<Arc<ServerState>>) -> Json<ModelsResponse> {
    let models = Source::ALL
        .into_iter()
        .map(|source| match state.registry.get(source) {
            Some(artifact) => ModelInfo {
                source,
                available: true,
                model: Some(artifact.model_name.clone()),
                trained_at: Some(artifact.trained_at.to_rfc3339()),
                training_samples: Some(artifact.training_samples),
                mae: Some(artifact.metrics.mae),
                r2: Some(artifact.metrics.r2),
            },
            None => ModelInfo {
                source,
                available: false,
                model: None,
                trained_at: None,
                training_samples: None,
                mae: None,
                r2: None,
            },
        })
        .collect();

    Json(ModelsResponse {
        features: FEATURE_COUNT,
        models,
    })
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub status: String,
    pub loaded: usize,
}

/// POST /api/models/reload
async fn reload_models(State(state): State<Arc<ServerState>>) -> Json<ReloadResponse> {
    let loaded = state.registry.reload();
    tracing::info!(loaded, "model registry reloaded");
    Json(ReloadResponse {
        status: "ok".to_string(),
        loaded,
    })
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub readings: Vec<Reading>,
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub status: String,
    pub ingested: usize,
}

/// POST /api/readings
///
/// Ingest new readings. Re-sending a `(source, timestamp)` pair replaces
/// the stored value.
async fn ingest_readings(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<IngestRequest>,
) -> Json<IngestResponse> {
    let ingested = state.store.insert_many(request.readings);
    tracing::debug!(ingested, "readings ingested");
    Json(IngestResponse {
        status: "ok".to_string(),
        ingested,
    })
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    store: Arc<ReadingStore>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config, store));

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/predictions", get(predictions))
        .route("/api/predict", post(predict_custom))
        .route("/api/data-points", get(data_points))
        .route("/api/models", get(models))
        .route("/api/models/reload", post(reload_models))
        .route("/api/readings", post(ingest_readings))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Prediction server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
