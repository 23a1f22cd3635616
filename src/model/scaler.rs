//! Per-feature standardization.
//!
//! Fit once on the training split, then reuse - never refit - for every
//! later transform, including live inference. Refitting at inference time
//! would silently shift the feature space out from under the regressor.

use crate::core::{FeatureVector, FEATURE_COUNT};
use crate::model::ModelError;
use serde::{Deserialize, Serialize};

/// Standardizes each feature column to mean 0 and unit variance.
///
/// Columns with zero variance in the training data (e.g. the year feature
/// over a short history) pass through unscaled rather than dividing by zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.means.is_empty()
    }

    /// Learn per-column mean and population standard deviation.
    pub fn fit(&mut self, x: &[FeatureVector]) -> Result<(), ModelError> {
        if x.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let n = x.len() as f64;
        let mut means = vec![0.0; FEATURE_COUNT];
        let mut stds = vec![0.0; FEATURE_COUNT];

        for row in x {
            for (j, &value) in row.iter().enumerate() {
                means[j] += value;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        for row in x {
            for (j, &value) in row.iter().enumerate() {
                stds[j] += (value - means[j]).powi(2);
            }
        }
        for std in &mut stds {
            *std = (*std / n).sqrt();
        }

        self.means = means;
        self.stds = stds;
        Ok(())
    }

    /// Standardize one vector with the fitted statistics.
    pub fn transform(&self, vector: &FeatureVector) -> Result<FeatureVector, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }

        let mut out = *vector;
        for (j, value) in out.iter_mut().enumerate() {
            if self.stds[j] > 0.0 {
                *value = (*value - self.means[j]) / self.stds[j];
            }
        }
        Ok(out)
    }

    /// Standardize a batch of vectors.
    pub fn transform_all(&self, x: &[FeatureVector]) -> Result<Vec<FeatureVector>, ModelError> {
        x.iter().map(|v| self.transform(v)).collect()
    }

    /// Fit on `x` and return the standardized training matrix.
    pub fn fit_transform(&mut self, x: &[FeatureVector]) -> Result<Vec<FeatureVector>, ModelError> {
        self.fit(x)?;
        self.transform_all(x)
    }
}
