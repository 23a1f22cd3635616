//! Aircast - SO₂ concentration forecasting from windowed sensor readings.
//!
//! This library turns raw pollutant-concentration time series into 7-day
//! forecasts. Each sensing source (ground station, satellite) gets its own
//! trained model; training and serving share one feature pipeline so the
//! two can never drift apart.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Aircast                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │  Reading  │──▶│   Windowed   │──▶│   Scaler +   │        │
//! │  │   Store   │   │   Features   │   │   Regressor  │        │
//! │  └───────────┘   └──────────────┘   └──────────────┘        │
//! │        │                                    │                │
//! │        ▼                                    ▼                │
//! │  ┌───────────┐                      ┌──────────────┐        │
//! │  │  CSV / API │                     │    Model     │        │
//! │  │   ingest   │                     │   Registry   │        │
//! │  └───────────┘                      └──────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use aircast::core::WindowedFeatureBuilder;
//! use aircast::model::{train_best, TrainConfig};
//! use aircast::reading::{load_csv, Source};
//!
//! let series = load_csv("ground.csv", Source::Ground).expect("load readings");
//! let outcome = train_best(Source::Ground, &series, &TrainConfig::default())
//!     .expect("train model");
//! outcome.artifact.save("models").expect("save artifact");
//! ```

pub mod config;
pub mod core;
pub mod model;
pub mod reading;
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    FeatureError, FeatureVector, TrainingSample, WindowedFeatureBuilder, DEFAULT_HORIZON,
    DEFAULT_WINDOW_SIZE, FEATURE_COUNT,
};
pub use model::{
    forecast, train_best, Forecast, ForecastError, ModelArtifact, ModelRegistry, TrainConfig,
};
pub use reading::{load_csv, Reading, ReadingStore, Source};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
