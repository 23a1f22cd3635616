//! Live forecasting against the registry and reading store.

use crate::core::{FeatureError, WindowedFeatureBuilder};
use crate::model::registry::ModelRegistry;
use crate::model::ModelError;
use crate::reading::{ReadingStore, Source};
use serde::Serialize;
use thiserror::Error;

/// One source's forecast: the predicted mean value over the model's horizon.
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub source: Source,
    pub prediction: f64,
    pub model_name: String,
    pub confidence: f64,
    pub horizon: usize,
}

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("no trained model for source '{0}'")]
    NoModel(Source),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Forecast the next horizon for `source` from its most recent readings.
///
/// The window size and horizon come from the artifact, so serving always
/// matches whatever shape the model was trained on.
pub fn forecast(
    registry: &ModelRegistry,
    store: &ReadingStore,
    source: Source,
) -> Result<Forecast, ForecastError> {
    let artifact = registry.get(source).ok_or(ForecastError::NoModel(source))?;

    let builder = WindowedFeatureBuilder::new(artifact.window_size, artifact.horizon);
    let recent = store.recent(source, artifact.window_size);
    let vector = builder.build_inference_vector(&recent)?;
    let scaled = artifact.scaler.transform(&vector)?;
    let prediction = artifact.regressor.predict_one(&scaled)?;

    tracing::debug!(%source, prediction, model = %artifact.model_name, "forecast computed");

    Ok(Forecast {
        source,
        prediction,
        model_name: artifact.model_name.clone(),
        confidence: artifact.confidence(),
        horizon: artifact.horizon,
    })
}
