//! Windowed feature and target construction.
//!
//! This is the one place where reading series become model inputs. The same
//! builder is used by the training pipeline and the inference path so the
//! feature layout can never drift between the two.
//!
//! Calendar components (month, day, hour) additionally get a sine/cosine
//! pair: raw integers impose a false linear distance between period
//! boundaries (December vs. January, hour 23 vs. hour 0), while the
//! cyclical pair keeps boundary-adjacent values numerically close.

use crate::reading::{Reading, Source};
use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::f64::consts::PI;
use thiserror::Error;

/// Length of every feature vector.
pub const FEATURE_COUNT: usize = 16;

/// Default lookback window, in readings.
pub const DEFAULT_WINDOW_SIZE: usize = 7;

/// Default forecast horizon, in readings.
pub const DEFAULT_HORIZON: usize = 7;

/// A fixed-layout vector of model features. Layout, in order:
///
/// 0. mean of the window values
/// 1. population standard deviation of the window values
/// 2. minimum window value
/// 3. maximum window value
/// 4. median window value
/// 5. calendar year of the last reading
/// 6. month (1-12) of the last reading
/// 7. day-of-month (1-31) of the last reading
/// 8. day-of-week (Monday = 0) of the last reading
/// 9. hour-of-day (0-23) of the last reading
/// 10-11. sin/cos of 2π·month/12
/// 12-13. sin/cos of 2π·day/31
/// 14-15. sin/cos of 2π·hour/24
pub type FeatureVector = [f64; FEATURE_COUNT];

/// One (features, target) pair for regressor fitting. The target is the
/// mean value over the `horizon` readings that follow the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub target: f64,
}

/// Errors from feature construction. Both are recoverable by the caller;
/// neither is ever replaced with a placeholder value.
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    /// Fewer readings available than the operation requires. Callers treat
    /// this as "not enough data yet", not as a fatal condition.
    #[error("insufficient data: need {needed} readings, have {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The supplied window mixes readings from more than one source.
    #[error("inconsistent source: expected {expected}, found {found}")]
    InconsistentSource { expected: Source, found: Source },
}

/// Converts time-ordered scalar series into feature vectors and training
/// targets. Stateless; every operation is a pure function of its input and
/// safe to call concurrently.
///
/// Inputs must already be sorted ascending by timestamp; the builder imposes
/// no ordering of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowedFeatureBuilder {
    window_size: usize,
    horizon: usize,
}

impl Default for WindowedFeatureBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_HORIZON)
    }
}

impl WindowedFeatureBuilder {
    pub fn new(window_size: usize, horizon: usize) -> Self {
        assert!(window_size > 0, "window_size must be positive");
        assert!(horizon > 0, "horizon must be positive");
        Self {
            window_size,
            horizon,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Build the 16-element feature vector for one window.
    ///
    /// Uses the trailing `window_size` readings of `window`; calendar
    /// features come from the last reading's timestamp. The standard
    /// deviation is the population convention (divide by N) - the same
    /// convention the regressors were trained against.
    pub fn build_feature_vector(&self, window: &[Reading]) -> Result<FeatureVector, FeatureError> {
        if window.len() < self.window_size {
            return Err(FeatureError::InsufficientData {
                needed: self.window_size,
                available: window.len(),
            });
        }
        let window = &window[window.len() - self.window_size..];

        let expected = window[0].source;
        if let Some(stray) = window.iter().find(|r| r.source != expected) {
            return Err(FeatureError::InconsistentSource {
                expected,
                found: stray.source,
            });
        }

        let values: Vec<f64> = window.iter().map(|r| r.value).collect();
        let mean = Statistics::mean(values.iter());
        let std = Statistics::population_std_dev(values.iter());
        let min = Statistics::min(values.iter());
        let max = Statistics::max(values.iter());
        let median = Data::new(values).median();

        let last = window[window.len() - 1].timestamp;
        let month = f64::from(last.month());
        let day = f64::from(last.day());
        let hour = f64::from(last.hour());

        Ok([
            mean,
            std,
            min,
            max,
            median,
            f64::from(last.year()),
            month,
            day,
            f64::from(last.weekday().num_days_from_monday()),
            hour,
            (2.0 * PI * month / 12.0).sin(),
            (2.0 * PI * month / 12.0).cos(),
            (2.0 * PI * day / 31.0).sin(),
            (2.0 * PI * day / 31.0).cos(),
            (2.0 * PI * hour / 24.0).sin(),
            (2.0 * PI * hour / 24.0).cos(),
        ])
    }

    /// Slide a one-step window over `series` and emit every
    /// (feature vector, future mean) pair.
    ///
    /// Returns an empty set, not an error, when the series is shorter than
    /// `window_size + horizon`. For an N-reading series this produces
    /// `N - window_size - horizon + 1` samples in ascending window-end
    /// order. Neighboring samples overlap by `window_size - 1` readings;
    /// the overlap is intentional - it maximizes sample count from limited
    /// history at the cost of high inter-sample correlation.
    pub fn build_training_set(
        &self,
        series: &[Reading],
    ) -> Result<Vec<TrainingSample>, FeatureError> {
        let n = series.len();
        if n < self.window_size + self.horizon {
            return Ok(Vec::new());
        }

        let mut samples = Vec::with_capacity(n - self.window_size - self.horizon + 1);
        for end in self.window_size..=(n - self.horizon) {
            let features = self.build_feature_vector(&series[end - self.window_size..end])?;
            let future = &series[end..end + self.horizon];
            let target = future.iter().map(|r| r.value).sum::<f64>() / self.horizon as f64;
            samples.push(TrainingSample { features, target });
        }
        Ok(samples)
    }

    /// Build the single inference vector from the most recent `window_size`
    /// readings of `series`. The fitted regressor's prediction over this
    /// vector is interpreted as the mean value over the next `horizon`
    /// periods.
    pub fn build_inference_vector(
        &self,
        series: &[Reading],
    ) -> Result<FeatureVector, FeatureError> {
        if series.len() < self.window_size {
            return Err(FeatureError::InsufficientData {
                needed: self.window_size,
                available: series.len(),
            });
        }
        self.build_feature_vector(&series[series.len() - self.window_size..])
    }
}
