//! Model layer: scaling, regressors, training, persistence, forecasting.
//!
//! The contract every piece honors: the scaler is fit once on training data
//! and reused unchanged at inference time, and the regressor only ever sees
//! feature vectors produced by the one shared `WindowedFeatureBuilder`.

pub mod forecast;
pub mod metrics;
pub mod registry;
pub mod regressor;
pub mod scaler;
pub mod trainer;

use thiserror::Error;

/// Errors from scaler or regressor misuse.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// `transform` or `predict` called before `fit`.
    #[error("model component used before fitting")]
    NotFitted,

    /// `fit` called with no samples.
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    /// Feature and target counts disagree.
    #[error("dimension mismatch: {features} feature rows vs {targets} targets")]
    DimensionMismatch { features: usize, targets: usize },
}

// Re-export commonly used types
pub use forecast::{forecast, Forecast, ForecastError};
pub use registry::{ArtifactMetrics, ModelArtifact, ModelRegistry, RegistryError};
pub use regressor::{KnnRegressor, LinearRegressor, Regressor, TrainedRegressor};
pub use scaler::StandardScaler;
pub use trainer::{train_best, CandidateReport, TrainConfig, TrainError, TrainOutcome};
