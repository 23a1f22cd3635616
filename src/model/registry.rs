//! Model artifact persistence and the in-process registry.
//!
//! One JSON artifact per source (`ground_model.json`, `satellite_model.json`)
//! bundling the fitted regressor with the scaler it was trained behind, so
//! the pair can never be deployed separately.
//!
//! The registry is constructed once at startup and injected wherever
//! forecasts are served; `reload` re-scans the directory so deployments can
//! swap artifacts without a process restart.

use crate::model::regressor::TrainedRegressor;
use crate::model::scaler::StandardScaler;
use crate::reading::Source;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use uuid::Uuid;

/// Held-out evaluation of the persisted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// A fitted (regressor, scaler) pair with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub id: Uuid,
    pub source: Source,
    pub model_name: String,
    pub window_size: usize,
    pub horizon: usize,
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
    pub metrics: ArtifactMetrics,
    pub scaler: StandardScaler,
    pub regressor: TrainedRegressor,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("artifact io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelArtifact {
    /// Artifact file name for a source within a models directory.
    pub fn file_name(source: Source) -> String {
        format!("{source}_model.json")
    }

    /// Reported forecast confidence: held-out R² clamped to [0, 1].
    pub fn confidence(&self) -> f64 {
        self.metrics.r2.clamp(0.0, 1.0)
    }

    /// Write the artifact into `dir`, creating it if needed. Returns the
    /// written path.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf, RegistryError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(self.source));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Per-source lookup of persisted model artifacts.
///
/// A missing artifact is "no model available", never an error; a corrupt
/// one is logged and skipped so a bad deploy of one source cannot take the
/// other down.
#[derive(Debug)]
pub struct ModelRegistry {
    dir: PathBuf,
    models: RwLock<HashMap<Source, Arc<ModelArtifact>>>,
}

impl ModelRegistry {
    /// Open a registry over `dir`, loading whatever artifacts exist.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let models = Self::scan(&dir);
        Self {
            dir,
            models: RwLock::new(models),
        }
    }

    fn scan(dir: &Path) -> HashMap<Source, Arc<ModelArtifact>> {
        let mut models = HashMap::new();
        for source in Source::ALL {
            let path = dir.join(ModelArtifact::file_name(source));
            if !path.exists() {
                tracing::debug!(%source, "no model artifact");
                continue;
            }
            match ModelArtifact::load(&path) {
                Ok(artifact) => {
                    tracing::info!(
                        %source,
                        model = %artifact.model_name,
                        trained_at = %artifact.trained_at,
                        "loaded model artifact"
                    );
                    models.insert(source, Arc::new(artifact));
                }
                Err(e) => {
                    tracing::warn!(%source, path = %path.display(), error = %e, "skipping unreadable model artifact");
                }
            }
        }
        models
    }

    /// The fitted pair for a source, or `None` when no artifact exists.
    pub fn get(&self, source: Source) -> Option<Arc<ModelArtifact>> {
        self.models
            .read()
            .expect("model registry lock poisoned")
            .get(&source)
            .cloned()
    }

    /// Sources that currently have a model.
    pub fn available(&self) -> Vec<Source> {
        let models = self.models.read().expect("model registry lock poisoned");
        Source::ALL
            .into_iter()
            .filter(|s| models.contains_key(s))
            .collect()
    }

    /// Re-scan the models directory, replacing the in-memory set. Returns
    /// the number of artifacts now loaded.
    pub fn reload(&self) -> usize {
        let fresh = Self::scan(&self.dir);
        let count = fresh.len();
        *self.models.write().expect("model registry lock poisoned") = fresh;
        count
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
