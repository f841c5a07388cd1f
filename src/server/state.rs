//! Application state management
//!
//! Model and metadata are read once at startup and never mutated afterwards,
//! so handlers share them without locking.

use crate::model::{Classifier, RandomForestClassifier};
use crate::training::{BEST_MODEL_FILE, METADATA_FILE};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    model: Option<Arc<dyn Classifier>>,
    metadata: Map<String, Value>,
}

impl AppState {
    /// Build state from already loaded parts
    pub fn new(model: Option<Arc<dyn Classifier>>, metadata: Map<String, Value>) -> Self {
        Self { model, metadata }
    }

    /// State with no model, every model-dependent request fails
    pub fn degraded() -> Self {
        Self::new(None, Map::new())
    }

    /// Load `best_model.json` and `model_metadata.json` from `models_dir`.
    ///
    /// A missing or unreadable model leaves the service degraded. Missing
    /// metadata only means an empty metadata object.
    pub fn load(models_dir: &Path) -> Self {
        let model_path = models_dir.join(BEST_MODEL_FILE);
        let model: Option<Arc<dyn Classifier>> = match RandomForestClassifier::load(&model_path) {
            Ok(model) => {
                info!(
                    path = %model_path.display(),
                    n_features = model.n_features(),
                    n_classes = model.n_classes(),
                    n_trees = model.n_trees(),
                    "Model loaded"
                );
                Some(Arc::new(model))
            }
            Err(e) => {
                warn!(path = %model_path.display(), error = %e, "Model not available, serving in degraded mode");
                None
            }
        };

        let metadata_path = models_dir.join(METADATA_FILE);
        let metadata = match std::fs::read(&metadata_path) {
            Ok(bytes) => match serde_json::from_slice::<Map<String, Value>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %metadata_path.display(), error = %e, "Metadata is not a JSON object, ignoring");
                    Map::new()
                }
            },
            Err(_) => {
                info!(path = %metadata_path.display(), "No metadata document found");
                Map::new()
            }
        };

        Self::new(model, metadata)
    }

    pub fn model(&self) -> Option<&Arc<dyn Classifier>> {
        self.model.as_ref()
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn state_name(&self) -> &'static str {
        if self.is_loaded() {
            "Loaded"
        } else {
            "DegradedNoModel"
        }
    }
}
