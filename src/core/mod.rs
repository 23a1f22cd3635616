//! Core feature engineering for the forecasting pipeline.

pub mod features;

// Re-export commonly used types
pub use features::{
    FeatureError, FeatureVector, TrainingSample, WindowedFeatureBuilder, DEFAULT_HORIZON,
    DEFAULT_WINDOW_SIZE, FEATURE_COUNT,
};
