//! Offline training and model selection.
//!
//! Mirrors the serving path exactly: the training set comes from the same
//! `WindowedFeatureBuilder`, and the scaler fitted here is the one shipped
//! inside the artifact. Candidates are fitted on a seeded shuffle split and
//! ranked by held-out mean absolute error.

use crate::core::{FeatureVector, WindowedFeatureBuilder, DEFAULT_HORIZON, DEFAULT_WINDOW_SIZE};
use crate::model::registry::{ArtifactMetrics, ModelArtifact};
use crate::model::regressor::{KnnRegressor, LinearRegressor, Regressor, TrainedRegressor};
use crate::model::scaler::StandardScaler;
use crate::model::{metrics, ModelError};
use crate::reading::{Reading, Source};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;
use uuid::Uuid;

/// Fewest training samples worth fitting against. Below this the held-out
/// split is too small to rank candidates.
pub const MIN_TRAINING_SAMPLES: usize = 8;

/// Training run parameters.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub window_size: usize,
    pub horizon: usize,
    /// Fraction of samples held out for candidate ranking.
    pub test_fraction: f64,
    /// Shuffle seed, for reproducible splits.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            horizon: DEFAULT_HORIZON,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Held-out performance of one candidate.
#[derive(Debug, Clone)]
pub struct CandidateReport {
    pub name: &'static str,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// Result of a training run: the winning artifact plus every candidate's
/// evaluation, for reporting.
#[derive(Debug)]
pub struct TrainOutcome {
    pub artifact: ModelArtifact,
    pub reports: Vec<CandidateReport>,
}

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("series too short: {samples} training samples, need at least {needed}")]
    TooFewSamples { samples: usize, needed: usize },

    #[error(transparent)]
    Feature(#[from] crate::core::FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

fn candidates() -> Vec<TrainedRegressor> {
    vec![
        TrainedRegressor::Linear(LinearRegressor::default()),
        TrainedRegressor::Knn(KnnRegressor::default()),
    ]
}

/// Train every candidate on `series` and return the best as a persistable
/// artifact.
pub fn train_best(
    source: Source,
    series: &[Reading],
    config: &TrainConfig,
) -> Result<TrainOutcome, TrainError> {
    let builder = WindowedFeatureBuilder::new(config.window_size, config.horizon);
    let samples = builder.build_training_set(series)?;
    if samples.len() < MIN_TRAINING_SAMPLES {
        return Err(TrainError::TooFewSamples {
            samples: samples.len(),
            needed: MIN_TRAINING_SAMPLES,
        });
    }

    tracing::info!(
        source = %source,
        readings = series.len(),
        samples = samples.len(),
        "building training split"
    );

    // Seeded shuffle, then split. Overlapping windows correlate neighboring
    // samples, so an unshuffled tail split would not be representative.
    let mut indices: Vec<usize> = (0..samples.len()).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(config.seed));

    let test_len = ((samples.len() as f64 * config.test_fraction).round() as usize)
        .clamp(1, samples.len() - 1);
    let (test_idx, train_idx) = indices.split_at(test_len);

    let collect = |idx: &[usize]| -> (Vec<FeatureVector>, Vec<f64>) {
        idx.iter()
            .map(|&i| (samples[i].features, samples[i].target))
            .unzip()
    };
    let (train_x, train_y) = collect(train_idx);
    let (test_x, test_y) = collect(test_idx);

    let mut scaler = StandardScaler::new();
    let train_scaled = scaler.fit_transform(&train_x)?;
    let test_scaled = scaler.transform_all(&test_x)?;

    let mut fitted = Vec::new();
    let mut reports = Vec::new();
    for mut candidate in candidates() {
        candidate.fit(&train_scaled, &train_y)?;
        let predictions = candidate.predict(&test_scaled)?;

        let report = CandidateReport {
            name: candidate.name(),
            mae: metrics::mae(&test_y, &predictions),
            rmse: metrics::rmse(&test_y, &predictions),
            r2: metrics::r2(&test_y, &predictions),
        };
        tracing::info!(
            model = report.name,
            mae = report.mae,
            rmse = report.rmse,
            r2 = report.r2,
            "candidate evaluated"
        );
        fitted.push(candidate);
        reports.push(report);
    }

    let best = reports
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.mae.total_cmp(&b.mae))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let winner = fitted.swap_remove(best);
    let winner_report = &reports[best];

    tracing::info!(source = %source, model = winner_report.name, mae = winner_report.mae, "selected model");

    let artifact = ModelArtifact {
        id: Uuid::new_v4(),
        source,
        model_name: winner_report.name.to_string(),
        window_size: config.window_size,
        horizon: config.horizon,
        trained_at: Utc::now(),
        training_samples: samples.len(),
        metrics: ArtifactMetrics {
            mae: winner_report.mae,
            rmse: winner_report.rmse,
            r2: winner_report.r2,
        },
        scaler,
        regressor: winner,
    };

    Ok(TrainOutcome { artifact, reports })
}
