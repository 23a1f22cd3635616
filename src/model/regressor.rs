//! Regression models over standardized feature vectors.
//!
//! Any regressor works here as long as it honors the feature/target
//! contract from `core::features`: fit against scaled 16-feature vectors,
//! predict the mean value over the next horizon. Two plain-Rust candidates
//! are provided; the trainer picks whichever validates best.

use crate::core::{FeatureVector, FEATURE_COUNT};
use crate::model::ModelError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Common interface for fitting and prediction.
pub trait Regressor {
    fn fit(&mut self, x: &[FeatureVector], y: &[f64]) -> Result<(), ModelError>;

    /// Predict one value per input vector.
    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<f64>, ModelError>;

    fn name(&self) -> &'static str;
}

fn check_fit_input(x: &[FeatureVector], y: &[f64]) -> Result<(), ModelError> {
    if x.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    if x.len() != y.len() {
        return Err(ModelError::DimensionMismatch {
            features: x.len(),
            targets: y.len(),
        });
    }
    Ok(())
}

/// Ordinary least squares fit by batch gradient descent.
///
/// Expects standardized inputs; the learning rate is tuned for unit-variance
/// feature columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    weights: Vec<f64>,
    bias: f64,
    epochs: usize,
    learning_rate: f64,
}

impl Default for LinearRegressor {
    fn default() -> Self {
        Self {
            weights: Vec::new(),
            bias: 0.0,
            epochs: 5000,
            learning_rate: 0.01,
        }
    }
}

impl LinearRegressor {
    pub fn new(epochs: usize, learning_rate: f64) -> Self {
        Self {
            epochs,
            learning_rate,
            ..Self::default()
        }
    }
}

impl Regressor for LinearRegressor {
    fn fit(&mut self, x: &[FeatureVector], y: &[f64]) -> Result<(), ModelError> {
        check_fit_input(x, y)?;

        let n = x.len() as f64;
        let mut weights = vec![0.0; FEATURE_COUNT];
        // Starting the bias at the target mean shortens the descent.
        let mut bias = y.iter().sum::<f64>() / n;

        for _ in 0..self.epochs {
            let mut grad_w = vec![0.0; FEATURE_COUNT];
            let mut grad_b = 0.0;

            for (row, &target) in x.iter().zip(y) {
                let predicted =
                    bias + row.iter().zip(&weights).map(|(a, b)| a * b).sum::<f64>();
                let error = predicted - target;
                grad_b += error;
                for (g, &value) in grad_w.iter_mut().zip(row.iter()) {
                    *g += error * value;
                }
            }

            bias -= self.learning_rate * 2.0 * grad_b / n;
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= self.learning_rate * 2.0 * g / n;
            }
        }

        self.weights = weights;
        self.bias = bias;
        Ok(())
    }

    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        if self.weights.is_empty() {
            return Err(ModelError::NotFitted);
        }
        Ok(x.iter()
            .map(|row| {
                self.bias + row.iter().zip(&self.weights).map(|(a, b)| a * b).sum::<f64>()
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}

/// Distance-weighted k-nearest-neighbour regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnRegressor {
    k: usize,
    x_train: Vec<FeatureVector>,
    y_train: Vec<f64>,
}

impl KnnRegressor {
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "k must be positive");
        Self {
            k,
            x_train: Vec::new(),
            y_train: Vec::new(),
        }
    }

    fn euclidean(a: &FeatureVector, b: &FeatureVector) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

impl Default for KnnRegressor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Regressor for KnnRegressor {
    fn fit(&mut self, x: &[FeatureVector], y: &[f64]) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        self.x_train = x.to_vec();
        self.y_train = y.to_vec();
        Ok(())
    }

    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        if self.x_train.is_empty() {
            return Err(ModelError::NotFitted);
        }

        let predictions = x
            .iter()
            .map(|sample| {
                let mut distances: Vec<(f64, f64)> = self
                    .x_train
                    .iter()
                    .zip(&self.y_train)
                    .map(|(train, &target)| (Self::euclidean(sample, train), target))
                    .collect();
                distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

                let neighbors = &distances[..self.k.min(distances.len())];
                let mut weight_sum = 0.0;
                let mut weighted = 0.0;
                for &(distance, target) in neighbors {
                    let weight = 1.0 / (distance + 1e-9);
                    weight_sum += weight;
                    weighted += weight * target;
                }
                weighted / weight_sum
            })
            .collect();
        Ok(predictions)
    }

    fn name(&self) -> &'static str {
        "knn"
    }
}

/// A fitted regressor in a serializable form, so model artifacts can
/// round-trip through JSON regardless of which candidate won selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainedRegressor {
    Linear(LinearRegressor),
    Knn(KnnRegressor),
}

impl TrainedRegressor {
    /// Convenience for single-vector inference.
    pub fn predict_one(&self, vector: &FeatureVector) -> Result<f64, ModelError> {
        let mut out = self.predict(std::slice::from_ref(vector))?;
        Ok(out.remove(0))
    }
}

impl Regressor for TrainedRegressor {
    fn fit(&mut self, x: &[FeatureVector], y: &[f64]) -> Result<(), ModelError> {
        match self {
            TrainedRegressor::Linear(model) => model.fit(x, y),
            TrainedRegressor::Knn(model) => model.fit(x, y),
        }
    }

    fn predict(&self, x: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        match self {
            TrainedRegressor::Linear(model) => model.predict(x),
            TrainedRegressor::Knn(model) => model.predict(x),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TrainedRegressor::Linear(model) => model.name(),
            TrainedRegressor::Knn(model) => model.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_feature(value: f64) -> FeatureVector {
        let mut v = [0.0; FEATURE_COUNT];
        v[0] = value;
        v
    }

    #[test]
    fn test_unfitted_predict_errors() {
        let linear = LinearRegressor::default();
        assert_eq!(
            linear.predict(&[single_feature(1.0)]),
            Err(ModelError::NotFitted)
        );

        let knn = KnnRegressor::default();
        assert_eq!(
            knn.predict(&[single_feature(1.0)]),
            Err(ModelError::NotFitted)
        );
    }

    #[test]
    fn test_fit_dimension_mismatch() {
        let mut linear = LinearRegressor::default();
        let err = linear.fit(&[single_feature(1.0)], &[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            ModelError::DimensionMismatch {
                features: 1,
                targets: 2
            }
        );
    }

    #[test]
    fn test_linear_recovers_line() {
        // y = 3x + 5 over x in [0, 1]
        let x: Vec<FeatureVector> = (0..=20).map(|i| single_feature(i as f64 / 20.0)).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v[0] + 5.0).collect();

        let mut model = LinearRegressor::default();
        model.fit(&x, &y).unwrap();

        let predicted = model.predict(&[single_feature(0.5)]).unwrap()[0];
        assert!(
            (predicted - 6.5).abs() < 0.1,
            "predicted {predicted}, expected ~6.5"
        );
    }

    #[test]
    fn test_knn_exact_neighbor_dominates() {
        let x = vec![single_feature(0.0), single_feature(10.0), single_feature(20.0)];
        let y = vec![1.0, 2.0, 3.0];

        let mut model = KnnRegressor::new(3);
        model.fit(&x, &y).unwrap();

        // A query sitting on a training point is dominated by that point's
        // inverse-distance weight.
        let predicted = model.predict(&[single_feature(10.0)]).unwrap()[0];
        assert!((predicted - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_knn_averages_between_neighbors() {
        let x = vec![single_feature(0.0), single_feature(2.0)];
        let y = vec![10.0, 20.0];

        let mut model = KnnRegressor::new(2);
        model.fit(&x, &y).unwrap();

        let predicted = model.predict(&[single_feature(1.0)]).unwrap()[0];
        assert!((predicted - 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_trained_regressor_serde_round_trip() {
        let x = vec![single_feature(0.0), single_feature(1.0), single_feature(2.0)];
        let y = vec![0.0, 2.0, 4.0];

        let mut model = TrainedRegressor::Knn(KnnRegressor::new(2));
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"knn\""));

        let restored: TrainedRegressor = serde_json::from_str(&json).unwrap();
        let probe = single_feature(1.5);
        assert_eq!(
            model.predict_one(&probe).unwrap(),
            restored.predict_one(&probe).unwrap()
        );
    }
}
